use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tertulia_core::tool::{Tool, ToolResult, parameter_schema_for};

use crate::trello::BoardService;

// Board failures are answered as text, so the model can tell the user.

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewCardParameters {
    #[schemars(description = "ID de la lista donde se crea la tarjeta.")]
    id_lista: String,
    #[schemars(description = "Título de la tarjeta.")]
    titulo: String,
    #[schemars(description = "Descripción de la tarjeta.")]
    descripcion: String,
}

/// Creates a card in a list of the board.
pub struct CreateCardTool {
    board: Arc<dyn BoardService>,
    parameter_schema: Value,
}

impl CreateCardTool {
    #[inline]
    pub fn new(board: Arc<dyn BoardService>) -> Self {
        CreateCardTool {
            board,
            parameter_schema: parameter_schema_for::<NewCardParameters>(),
        }
    }
}

impl Tool for CreateCardTool {
    type Input = NewCardParameters;

    fn name(&self) -> &str {
        "crearTarjeta"
    }

    fn description(&self) -> &str {
        "Crea una nueva tarjeta (card) en Trello en una lista específica"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: NewCardParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let board = self.board.clone();
        async move {
            info!(
                "creating card `{}` in list `{}`",
                input.titulo, input.id_lista
            );
            let result = board
                .create_card(&input.id_lista, &input.titulo, &input.descripcion)
                .await;
            Ok(match result {
                Ok(()) => "¡Éxito! Tarjeta creada correctamente en Trello.".to_owned(),
                Err(err) => format!("Error al crear la tarjeta: {err}"),
            })
        }
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct NoParameters {}

/// Lists the lists of the configured board, with their IDs.
pub struct ListBoardListsTool {
    board: Arc<dyn BoardService>,
    parameter_schema: Value,
}

impl ListBoardListsTool {
    #[inline]
    pub fn new(board: Arc<dyn BoardService>) -> Self {
        ListBoardListsTool {
            board,
            parameter_schema: parameter_schema_for::<NoParameters>(),
        }
    }
}

impl Tool for ListBoardListsTool {
    type Input = NoParameters;

    fn name(&self) -> &str {
        "obtenerListasDelTablero"
    }

    fn description(&self) -> &str {
        "Obtiene todas las listas disponibles en el tablero actual con sus IDs"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        _input: NoParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let board = self.board.clone();
        async move {
            info!("reading the board lists");
            Ok(match board.board_lists().await {
                Ok(lists) => format!("Aquí están las listas y sus IDs: {lists}"),
                Err(err) => format!("Error al leer las listas: {err}"),
            })
        }
    }
}
