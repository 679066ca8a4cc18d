//! Initial content for the service

use std::path::Path;

use anyhow::Context;

use crate::annotations::ContentBlock;

/// Read blocks from a JSON array file
pub async fn load_seed(path: &Path) -> anyhow::Result<Vec<ContentBlock>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read content seed {}", path.display()))?;

    let blocks: Vec<ContentBlock> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid content seed {}", path.display()))?;

    tracing::info!(path = %path.display(), blocks = blocks.len(), "Loaded content seed");
    Ok(blocks)
}

/// Content served when no seed file is configured
pub fn default_blocks() -> Vec<ContentBlock> {
    [
        (
            "intro-heading",
            "heading",
            "<h1>About this project</h1>",
        ),
        (
            "intro-paragraph",
            "paragraph",
            "<p>We build open tools for <strong>neighbourhood</strong> groups &amp; the people who run them.</p>",
        ),
        (
            "mission-paragraph",
            "paragraph",
            "<p>Everything here is written together: select any passage to comment on it or suggest a change.</p>",
        ),
    ]
    .into_iter()
    .enumerate()
    .map(|(order, (key, block_type, content))| {
        let mut block = ContentBlock::new(key, content);
        block.block_type = block_type.to_string();
        block.display_order = order as i32;
        block
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_blocks_are_ordered() {
        let blocks = default_blocks();
        assert_eq!(blocks.len(), 3);
        assert!(blocks.windows(2).all(|w| w[0].display_order < w[1].display_order));
        assert_eq!(blocks[0].plain_text(), "About this project");
    }

    #[tokio::test]
    async fn test_missing_seed_file_is_an_error() {
        let err = load_seed(Path::new("/nonexistent/seed.json")).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read content seed"));
    }
}
