//! Prompt builder for rendering templates.

use crate::loader::resolve_prompt;
use crate::types::{BuiltPrompt, PromptDefinition};
use hybrid_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;
use std::path::Path;

/// Prompt ids used by the orchestrator stages.
pub const ROUTER: &str = "agent.router";
pub const PLANNER: &str = "agent.planner";
pub const SQL: &str = "agent.sql";
pub const SYNTHESIZER: &str = "agent.synthesizer";

/// Build a prompt from a definition and input variables.
///
/// Renders the system and user templates with Handlebars (no HTML escaping).
/// Missing variables render as empty strings.
///
/// # Example
/// ```no_run
/// use hybrid_prompt::{build_prompt, builtin_prompt};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt("agent.router")?;
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "Top 3 products by revenue?".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let user = render_template(&definition.template, &variables)?;
    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?;

    Ok(BuiltPrompt::new(system, user, definition.id.clone(), variables))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .render_template(template, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

/// The four stage prompts, loaded and validated once.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    definitions: HashMap<String, PromptDefinition>,
}

impl PromptLibrary {
    /// Load every stage prompt, preferring workspace overrides.
    pub fn load(workspace: Option<&Path>) -> AppResult<Self> {
        let mut definitions = HashMap::new();
        for id in [ROUTER, PLANNER, SQL, SYNTHESIZER] {
            definitions.insert(id.to_string(), resolve_prompt(workspace, id)?);
        }

        Ok(Self { definitions })
    }

    /// Built-in prompts only.
    pub fn builtin() -> AppResult<Self> {
        Self::load(None)
    }

    /// Render the prompt `id` with `variables`.
    pub fn render(&self, id: &str, variables: HashMap<String, String>) -> AppResult<BuiltPrompt> {
        let definition = self
            .definitions
            .get(id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt '{}'", id)))?;

        build_prompt(definition, variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PromptOutputSpec;

    fn create_test_definition(system: Option<&str>) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            system: system.map(str::to_string),
            template: "Question: {{question}}".to_string(),
            output: PromptOutputSpec {
                format: "json".to_string(),
            },
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_simple_template() {
        let result = render_template("Question: {{question}}", &vars(&[("question", "Hi")]));
        assert_eq!(result.unwrap(), "Question: Hi");
    }

    #[test]
    fn test_render_does_not_escape() {
        let result = render_template("{{sql}}", &vars(&[("sql", "SELECT * FROM \"Order Details\" WHERE a < 3")]));
        assert_eq!(result.unwrap(), "SELECT * FROM \"Order Details\" WHERE a < 3");
    }

    #[test]
    fn test_render_template_missing_variable() {
        let result = render_template("Error: {{error}}", &HashMap::new());
        assert_eq!(result.unwrap(), "Error: ");
    }

    #[test]
    fn test_build_prompt_with_system() {
        let def = create_test_definition(Some("Answer about {{question}}"));
        let built = build_prompt(&def, vars(&[("question", "revenue")])).unwrap();

        assert_eq!(built.user, "Question: revenue");
        assert_eq!(built.system.as_deref(), Some("Answer about revenue"));
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
    }

    #[test]
    fn test_build_prompt_without_system() {
        let def = create_test_definition(None);
        let built = build_prompt(&def, vars(&[("question", "revenue")])).unwrap();
        assert!(built.system.is_none());
    }

    #[test]
    fn test_library_renders_sql_prompt() {
        let library = PromptLibrary::builtin().unwrap();
        let built = library
            .render(
                SQL,
                vars(&[
                    ("schema", "Table Name: **demo_orders**"),
                    ("constraints", "{}"),
                    ("question", "Total revenue in 1997?"),
                    ("previous_sql", "SELECT 1"),
                    ("error", "no such column: Revenue"),
                ]),
            )
            .unwrap();

        assert!(built.user.contains("Table Name: **demo_orders**"));
        assert!(built.user.contains("Total revenue in 1997?"));
        assert!(built.user.contains("no such column: Revenue"));
        assert!(built.system.is_some());
    }

    #[test]
    fn test_library_unknown_prompt() {
        let library = PromptLibrary::builtin().unwrap();
        assert!(library.render("agent.unknown", HashMap::new()).is_err());
    }
}
