//! Reply and prompt templates, embedded at compile time and rendered with tera.

use tera::{Context, Tera};
use thiserror::Error;

use lucy_core::flows::ResponsibilityDomain;

const EMBEDDED: &[(&str, &str)] = &[
    ("replies/accepted.txt", include_str!("../templates/replies/accepted.txt")),
    ("replies/asset.txt", include_str!("../templates/replies/asset.txt")),
    ("replies/business_prompt.txt", include_str!("../templates/replies/business_prompt.txt")),
    ("replies/business_view.txt", include_str!("../templates/replies/business_view.txt")),
    ("replies/challenge_prompt.txt", include_str!("../templates/replies/challenge_prompt.txt")),
    ("replies/declined.txt", include_str!("../templates/replies/declined.txt")),
    ("replies/greeting.txt", include_str!("../templates/replies/greeting.txt")),
    ("replies/loan_use_prompt.txt", include_str!("../templates/replies/loan_use_prompt.txt")),
    ("replies/love_prompt.txt", include_str!("../templates/replies/love_prompt.txt")),
    ("replies/offer.txt", include_str!("../templates/replies/offer.txt")),
    (
        "replies/photo_need_location.txt",
        include_str!("../templates/replies/photo_need_location.txt"),
    ),
    ("replies/photo_need_photos.txt", include_str!("../templates/replies/photo_need_photos.txt")),
    ("replies/photo_prompt.txt", include_str!("../templates/replies/photo_prompt.txt")),
    ("replies/passion.txt", include_str!("../templates/replies/passion.txt")),
    ("replies/photo_received.txt", include_str!("../templates/replies/photo_received.txt")),
    ("replies/readiness.txt", include_str!("../templates/replies/readiness.txt")),
    ("replies/role.txt", include_str!("../templates/replies/role.txt")),
    ("replies/sales_analysis.txt", include_str!("../templates/replies/sales_analysis.txt")),
    ("replies/sales_prompt.txt", include_str!("../templates/replies/sales_prompt.txt")),
    ("replies/tip.txt", include_str!("../templates/replies/tip.txt")),
    ("prompts/coaching.txt", include_str!("../templates/prompts/coaching.txt")),
    ("prompts/photo.txt", include_str!("../templates/prompts/photo.txt")),
    ("prompts/underwriting.txt", include_str!("../templates/prompts/underwriting.txt")),
];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to load templates: {0}")]
    Load(String),
    #[error("failed to render `{name}`: {message}")]
    Render { name: String, message: String },
}

#[derive(Clone, Debug)]
pub struct TemplateCatalog {
    tera: Tera,
}

impl TemplateCatalog {
    pub fn embedded() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(EMBEDDED.iter().copied())
            .map_err(|error| TemplateError::Load(error.to_string()))?;
        Ok(Self { tera })
    }

    /// Renders `replies/<name>.txt` with surrounding whitespace trimmed.
    pub fn reply(&self, name: &str, context: &Context) -> Result<String, TemplateError> {
        self.render(&format!("replies/{name}.txt"), context)
    }

    /// Renders the collaborator prompt for a responsibility domain. The greeting has none.
    pub fn prompt(
        &self,
        domain: ResponsibilityDomain,
        context: &Context,
    ) -> Result<Option<String>, TemplateError> {
        let name = match domain {
            ResponsibilityDomain::Greeting => return Ok(None),
            ResponsibilityDomain::Photo => "prompts/photo.txt",
            ResponsibilityDomain::Coaching => "prompts/coaching.txt",
            ResponsibilityDomain::Underwriting => "prompts/underwriting.txt",
        };
        self.render(name, context).map(Some)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names = self.tera.get_template_names().collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    fn render(&self, name: &str, context: &Context) -> Result<String, TemplateError> {
        self.tera
            .render(name, context)
            .map(|rendered| rendered.trim().to_owned())
            .map_err(|error| TemplateError::Render {
                name: name.to_owned(),
                message: render_error_chain(&error),
            })
    }
}

fn render_error_chain(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
