//! Tools offered to the assistant.

mod calculator;
mod trello;

use std::sync::Arc;

use tertulia_core::tool::{Error as ToolError, ToolRegistry};

pub use calculator::{CountLettersTool, MultiplyTool, SumTool};
pub use trello::{CreateCardTool, ListBoardListsTool};

use crate::trello::BoardService;

/// Returns a registry with the calculator and board tools.
pub fn builtin_registry(
    board: Arc<dyn BoardService>,
) -> Result<ToolRegistry, ToolError> {
    ToolRegistry::default()
        .with_tool(SumTool::new())?
        .with_tool(MultiplyTool::new())?
        .with_tool(CountLettersTool::new())?
        .with_tool(CreateCardTool::new(board.clone()))?
        .with_tool(ListBoardListsTool::new(board))
}
