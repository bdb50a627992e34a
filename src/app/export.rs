use tokio::io::{AsyncWriteExt, BufWriter};

use super::runner::RunResult;

/// Writes the run result as pretty JSON.
pub(crate) async fn export_json(path: &str, result: &RunResult) -> Result<(), std::io::Error> {
    let json = serde_json::to_vec_pretty(result).map_err(std::io::Error::other)?;
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&json).await?;
    writer.flush().await?;
    Ok(())
}
