use anyhow::bail;

use bk_core::config::Config;
use bk_core::types::BoardId;

/// Run the `accept-removal` subcommand: record that a board's removal
/// proposal merged, retiring its health record.
pub async fn run(config: &Config, board: &str) -> anyhow::Result<()> {
    if board.split('/').filter(|s| !s.is_empty()).count() < 2 {
        bail!("board must be given as vendor/model, got {board:?}");
    }
    let board = BoardId::from(board);

    let store = super::open_store(config).await?;
    bk_health::record_removal_accepted(&store, &board).await?;
    println!("{board} marked removed.");
    Ok(())
}
