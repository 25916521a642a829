//! Prompt loader for YAML prompt definitions.
//!
//! Built-in definitions ship inside the binary. A workspace may override any
//! of them by placing `<id>.yml` under `.hybrid/prompts/`.

use crate::types::PromptDefinition;
use hybrid_core::{AppError, AppResult};
use std::path::Path;

/// Built-in prompt sources keyed by id.
const BUILTIN_PROMPTS: [(&str, &str); 4] = [
    ("agent.router", include_str!("../prompts/agent.router.yml")),
    ("agent.planner", include_str!("../prompts/agent.planner.yml")),
    ("agent.sql", include_str!("../prompts/agent.sql.yml")),
    (
        "agent.synthesizer",
        include_str!("../prompts/agent.synthesizer.yml"),
    ),
];

/// Load a prompt definition by ID from the workspace.
///
/// This function reads `<id>.yml` from the `.hybrid/prompts/` directory.
///
/// # Arguments
/// * `workspace_path` - Root workspace directory containing `.hybrid/`
/// * `prompt_id` - Prompt identifier (e.g., "agent.router")
///
/// # Example
/// ```no_run
/// use hybrid_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "agent.router")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path
        .join(".hybrid/prompts")
        .join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition = parse_prompt(&contents)
        .map_err(|e| AppError::Prompt(format!("{:?}: {}", prompt_file, e)))?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file {:?} declares id '{}'",
            prompt_file, definition.id
        )));
    }

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Load a built-in prompt definition.
pub fn builtin_prompt(prompt_id: &str) -> AppResult<PromptDefinition> {
    let source = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .map(|(_, source)| *source)
        .ok_or_else(|| AppError::Prompt(format!("No built-in prompt '{}'", prompt_id)))?;

    parse_prompt(source)
}

/// Workspace override if one exists, otherwise the built-in definition.
pub fn resolve_prompt(workspace_path: Option<&Path>, prompt_id: &str) -> AppResult<PromptDefinition> {
    if let Some(workspace) = workspace_path {
        let override_file = workspace
            .join(".hybrid/prompts")
            .join(format!("{}.yml", prompt_id));
        if override_file.exists() {
            return load_prompt(workspace, prompt_id);
        }
    }

    builtin_prompt(prompt_id)
}

fn parse_prompt(contents: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML: {}", e)))?;

    validate_prompt(&definition)?;

    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.api_version.is_empty() {
        return Err(AppError::Prompt(
            "Prompt apiVersion cannot be empty".to_string(),
        ));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_prompt(dir: &Path, id: &str, valid: bool) -> PathBuf {
        let prompts_dir = dir.join(".hybrid/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();

        let content = if valid {
            format!(
                r#"
id: {}
title: "Test Prompt"
apiVersion: "1.0"
createdBy: test
template: "Override: {{{{question}}}}"
output:
  format: json
"#,
                id
            )
        } else {
            "invalid: yaml: content:".to_string()
        };

        let file_path = prompts_dir.join(format!("{}.yml", id));
        fs::write(&file_path, content).unwrap();
        file_path
    }

    #[test]
    fn test_all_builtins_parse() {
        for (id, _) in BUILTIN_PROMPTS {
            let def = builtin_prompt(id).unwrap();
            assert_eq!(def.id, id);
            assert_eq!(def.output.format, "json");
        }
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(builtin_prompt("agent.unknown").is_err());
    }

    #[test]
    fn test_load_valid_prompt() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "agent.router", true);

        let prompt = load_prompt(temp_dir.path(), "agent.router").unwrap();
        assert_eq!(prompt.id, "agent.router");
        assert_eq!(prompt.title, "Test Prompt");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "invalid", false);
        assert!(load_prompt(temp_dir.path(), "invalid").is_err());
    }

    #[test]
    fn test_load_rejects_mismatched_id() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_test_prompt(temp_dir.path(), "agent.sql", true);
        fs::rename(&path, path.with_file_name("agent.planner.yml")).unwrap();

        assert!(load_prompt(temp_dir.path(), "agent.planner").is_err());
    }

    #[test]
    fn test_resolve_prefers_workspace_override() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "agent.router", true);

        let overridden = resolve_prompt(Some(temp_dir.path()), "agent.router").unwrap();
        assert!(overridden.template.starts_with("Override:"));

        let builtin = resolve_prompt(Some(temp_dir.path()), "agent.sql").unwrap();
        assert_eq!(builtin.id, "agent.sql");

        let no_workspace = resolve_prompt(None, "agent.router").unwrap();
        assert!(!no_workspace.template.starts_with("Override:"));
    }

    #[test]
    fn test_validate_rejects_bad_api_version() {
        let mut def = builtin_prompt("agent.router").unwrap();
        def.api_version = "1".to_string();
        assert!(validate_prompt(&def).is_err());
    }
}
