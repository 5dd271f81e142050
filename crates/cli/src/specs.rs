//! Spec list collection and tag filtering.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Settings;

/// Collect spec paths from the arguments and the list file.
pub async fn collect_specs(paths: &[PathBuf], list: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut specs = paths.to_vec();

    if let Some(list) = list {
        specs.extend(read_spec_list(list).await?);
    }

    if specs.is_empty() {
        bail!("No spec paths given");
    }
    Ok(specs)
}

/// One path per line, blank lines skipped.
pub async fn read_spec_list(path: &Path) -> Result<Vec<PathBuf>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read spec list {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Apply the tag expression. An expression that leaves nothing to run
/// is fatal.
pub async fn filter_specs(settings: &Settings, specs: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    let Some(expression) = settings.tag_expression() else {
        return Ok(specs);
    };

    let filtered = settings
        .spec_filter()
        .filter_suite(&specs, expression)
        .await
        .with_context(|| format!("Invalid tag expression '{}'", expression))?;

    if filtered.is_empty() {
        bail!("No specs match tag expression '{}'", expression);
    }
    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn with_tags(tags: &str) -> Settings {
        Settings {
            tags: Some(tags.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_no_expression_keeps_every_spec() {
        let dir = tempfile::tempdir().unwrap();
        let specs = vec![
            write(dir.path(), "a.feature", "@BE\nFeature: A\n"),
            write(dir.path(), "b.feature", "@FE\nFeature: B\n"),
        ];

        let filtered = filter_specs(&Settings::default(), specs.clone()).await.unwrap();
        assert_eq!(filtered, specs);
    }

    #[tokio::test]
    async fn test_expression_matching_nothing_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let specs = vec![write(dir.path(), "a.feature", "@FE\nFeature: A\n")];

        let err = filter_specs(&with_tags("@BE"), specs).await.unwrap_err();
        assert!(err.to_string().contains("No specs match tag expression '@BE'"));
    }

    #[tokio::test]
    async fn test_non_feature_specs_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let backend = write(dir.path(), "backend.feature", "@BE\nFeature: Backend\n");
        let frontend = write(dir.path(), "frontend.feature", "@FE\nFeature: Frontend\n");
        let plain = write(dir.path(), "smoke.cy.js", "it('works')\n");

        let filtered = filter_specs(&with_tags("@BE"), vec![plain.clone(), frontend, backend.clone()])
            .await
            .unwrap();
        assert_eq!(filtered, vec![backend, plain]);
    }

    #[tokio::test]
    async fn test_invalid_expression_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let specs = vec![write(dir.path(), "a.feature", "@BE\nFeature: A\n")];

        let err = filter_specs(&with_tags("(@BE"), specs).await.unwrap_err();
        assert!(err.to_string().contains("Invalid tag expression"));
    }

    #[tokio::test]
    async fn test_collect_from_arguments_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let list = write(dir.path(), "specs.txt", "b.feature\n\n  c.feature  \n");

        let specs = collect_specs(&[PathBuf::from("a.feature")], Some(&list)).await.unwrap();
        assert_eq!(
            specs,
            vec![PathBuf::from("a.feature"), PathBuf::from("b.feature"), PathBuf::from("c.feature")]
        );

        assert!(collect_specs(&[], None).await.is_err());
        assert!(collect_specs(&[], Some(&dir.path().join("missing.txt"))).await.is_err());
    }
}
