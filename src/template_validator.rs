use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tera::Tera;

/// Maximum template file size (1MB)
const MAX_TEMPLATE_SIZE: u64 = 1024 * 1024;

/// Variables a prompt template has to use to produce a useful prompt
const REQUIRED_VARIABLES: &[&str] = &["username", "posts", "comments"];

/// Also available, but optional
const OPTIONAL_VARIABLES: &[&str] = &["post_count", "comment_count"];

/// Validates external prompt templates
pub(crate) struct TemplateValidator;

impl TemplateValidator {
    /// Validates an external template file
    ///
    /// Performs the following checks:
    /// 1. File exists and is a regular file
    /// 2. File size is within limits
    /// 3. Template is not blank and compiles under Tera
    /// 4. Template references `username`, `posts` and `comments`
    ///
    /// # Errors
    ///
    /// Returns an IO error for a missing file and a validation error for
    /// everything else.
    pub(crate) fn validate_template(path: &Path) -> Result<()> {
        let display = path.to_string_lossy().to_string();

        if !path.exists() {
            return Err(Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "Template file not found"),
            ));
        }

        if !path.is_file() {
            return Err(Error::template_validation(display, "Path is not a file"));
        }

        let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
        if metadata.len() > MAX_TEMPLATE_SIZE {
            return Err(Error::template_validation(
                display,
                format!(
                    "Template file too large: {} bytes (max: {} bytes)",
                    metadata.len(),
                    MAX_TEMPLATE_SIZE
                ),
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

        if content.trim().is_empty() {
            return Err(Error::template_validation(display, "Template file is empty"));
        }

        let mut tera = Tera::default();
        tera.add_raw_template("validation", &content)
            .map_err(|e| {
                Error::template_validation(display.clone(), format!("Template syntax error: {e}"))
            })?;

        Self::check_required_variables(&content, &display)?;
        Self::check_optional_variables(&content);

        Ok(())
    }

    /// Heuristic check that each required variable is referenced somewhere.
    fn check_required_variables(content: &str, display: &str) -> Result<()> {
        let missing: Vec<&str> = REQUIRED_VARIABLES
            .iter()
            .filter(|var| !references(content, var))
            .copied()
            .collect();

        if !missing.is_empty() {
            return Err(Error::template_validation(
                display,
                format!(
                    "Template may be missing required variables: {}. \n\
                    Templates should access: username, posts, comments. \n\
                    See templates/persona_prompt.tera for reference.",
                    missing.join(", ")
                ),
            ));
        }

        Ok(())
    }

    fn check_optional_variables(content: &str) {
        for var in OPTIONAL_VARIABLES {
            if !references(content, var) {
                tracing::debug!("Template does not use optional variable: {}", var);
            }
        }
    }
}

fn references(content: &str, var: &str) -> bool {
    let patterns = [
        format!("{{{{ {var}"), // {{ var
        format!("{{{{{var}"),  // {{var
        format!("in {var}"),   // {% for x in var %}
        format!("if {var}"),   // {% if var %}
    ];

    patterns.iter().any(|pattern| content.contains(pattern.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_validate_valid_template() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template_file = temp.child("persona.tera");
        template_file
            .write_str(
                "User {{ username }}\n\
                {% for post in posts %}{{ post.title }}{% endfor %}\n\
                {% for comment in comments %}{{ comment.body }}{% endfor %}",
            )
            .unwrap();

        let result = TemplateValidator::validate_template(template_file.path());
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_builtin_template() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates/persona_prompt.tera");
        assert!(TemplateValidator::validate_template(&path).is_ok());
    }

    #[test]
    fn test_validate_nonexistent_file() {
        let result = TemplateValidator::validate_template(Path::new("/nonexistent/template.tera"));
        assert!(result.is_err());
        assert!(result.unwrap_err().is_io());
    }

    #[test]
    fn test_validate_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = TemplateValidator::validate_template(temp.path());
        assert!(result.unwrap_err().to_string().contains("not a file"));
    }

    #[test]
    fn test_validate_empty_template() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template_file = temp.child("empty.tera");
        template_file.write_str("   \n  \n  ").unwrap();

        let result = TemplateValidator::validate_template(template_file.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_validate_syntax_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template_file = temp.child("invalid.tera");
        template_file
            .write_str("{% if username %}\nUnclosed if")
            .unwrap();

        let result = TemplateValidator::validate_template(template_file.path());
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Template syntax error")
        );
    }

    #[test]
    fn test_validate_missing_required_vars() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template_file = temp.child("incomplete.tera");
        template_file
            .write_str("Hello {{ username }}, {% for post in posts %}{{ post.title }}{% endfor %}")
            .unwrap();

        let result = TemplateValidator::validate_template(template_file.path());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("missing required variables: comments"));
    }

    #[test]
    fn test_validate_file_too_large() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template_file = temp.child("large.tera");

        let large_content = "x".repeat((MAX_TEMPLATE_SIZE + 1) as usize);
        template_file.write_str(&large_content).unwrap();

        let result = TemplateValidator::validate_template(template_file.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("too large"));
    }
}
