use crate::model::result::BatchResult;

pub fn render_batch_json(batch: &BatchResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(batch)
}
