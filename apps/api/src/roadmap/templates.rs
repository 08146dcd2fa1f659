//! Built-in roadmap templates.
//!
//! Templates are compiled in and never mutated. A user's roadmap is a copy
//! of one template's steps with every `completed` flag cleared.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::models::roadmap::{RoadmapStep, UserRoadmap};

#[derive(Debug, Clone, Serialize)]
pub struct TemplateStep {
    pub order: u32,
    pub label: &'static str,
    #[serde(rename = "estTime")]
    pub est_time: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoadmapTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub steps: &'static [TemplateStep],
}

impl RoadmapTemplate {
    /// Binds a fresh copy of this template to `user_id`, nothing completed.
    pub fn instantiate(&self, user_id: Uuid) -> UserRoadmap {
        UserRoadmap {
            user_id,
            roadmap_id: self.id.to_string(),
            title: self.title.to_string(),
            steps: self
                .steps
                .iter()
                .map(|s| RoadmapStep {
                    order: s.order,
                    label: s.label.to_string(),
                    est_time: s.est_time.to_string(),
                    completed: false,
                })
                .collect(),
            last_updated: Utc::now(),
        }
    }
}

const fn step(order: u32, label: &'static str, est_time: &'static str) -> TemplateStep {
    TemplateStep {
        order,
        label,
        est_time,
    }
}

static TEMPLATES: &[RoadmapTemplate] = &[
    RoadmapTemplate {
        id: "frontend",
        title: "Frontend Developer",
        steps: &[
            step(1, "Learn HTML, CSS and modern JavaScript", "6 weeks"),
            step(2, "Build projects with a component framework such as React", "8 weeks"),
            step(3, "Ship a portfolio site and apply to frontend roles", "4 weeks"),
        ],
    },
    RoadmapTemplate {
        id: "backend",
        title: "Backend Developer",
        steps: &[
            step(1, "Master one server-side language", "8 weeks"),
            step(2, "Learn relational databases and SQL", "4 weeks"),
            step(3, "Design and document REST APIs", "3 weeks"),
            step(4, "Add authentication, caching and background jobs", "4 weeks"),
            step(5, "Deploy a service with CI and monitoring", "3 weeks"),
        ],
    },
    RoadmapTemplate {
        id: "data-science",
        title: "Data Scientist",
        steps: &[
            step(1, "Refresh statistics and linear algebra", "6 weeks"),
            step(2, "Learn Python with pandas and NumPy", "4 weeks"),
            step(3, "Practice data cleaning and visualization", "3 weeks"),
            step(4, "Train and evaluate classical ML models", "6 weeks"),
            step(5, "Publish two end-to-end analysis projects", "6 weeks"),
        ],
    },
    RoadmapTemplate {
        id: "devops",
        title: "DevOps Engineer",
        steps: &[
            step(1, "Get comfortable with Linux and shell scripting", "4 weeks"),
            step(2, "Learn containers and Docker", "3 weeks"),
            step(3, "Build CI/CD pipelines", "3 weeks"),
            step(4, "Manage infrastructure as code", "4 weeks"),
            step(5, "Operate workloads on Kubernetes", "6 weeks"),
            step(6, "Set up observability and incident response", "3 weeks"),
        ],
    },
    RoadmapTemplate {
        id: "ux-design",
        title: "UX Designer",
        steps: &[
            step(1, "Study design principles and accessibility", "4 weeks"),
            step(2, "Run user research interviews", "3 weeks"),
            step(3, "Wireframe and prototype in a design tool", "4 weeks"),
            step(4, "Build a case-study portfolio", "6 weeks"),
        ],
    },
    RoadmapTemplate {
        id: "product-management",
        title: "Product Manager",
        steps: &[
            step(1, "Learn product discovery and customer interviews", "4 weeks"),
            step(2, "Write PRDs and prioritize a backlog", "3 weeks"),
            step(3, "Define metrics and run experiments", "4 weeks"),
            step(4, "Lead a cross-functional launch", "8 weeks"),
        ],
    },
];

pub fn all_templates() -> &'static [RoadmapTemplate] {
    TEMPLATES
}

pub fn find_template(id: &str) -> Option<&'static RoadmapTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}
