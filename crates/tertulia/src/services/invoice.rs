use serde::{Deserialize, Serialize};
use tertulia_core::ModelClient;
use tertulia_model::{ModelMessage, ModelParameters};

use crate::config::InvoiceSettings;
use crate::error::ApiError;

/// The structured data pulled out of a free-form invoice text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "cliente")]
    pub customer: String,
    #[serde(rename = "fecha")]
    pub date: String,
    pub total: f64,
    #[serde(rename = "productos")]
    pub products: Vec<String>,
}

/// Asks the model to turn raw invoice text into an [`Invoice`].
pub struct InvoiceService {
    model_client: ModelClient,
    parameters: ModelParameters,
}

impl InvoiceService {
    pub fn new(model_client: ModelClient, settings: &InvoiceSettings) -> Self {
        Self {
            model_client,
            parameters: ModelParameters::default()
                .with_temperature(settings.temperature)
                .with_max_output_tokens(settings.max_output_tokens),
        }
    }

    pub async fn extract(&self, raw: &str) -> Result<Invoice, ApiError> {
        let resp = self
            .model_client
            .chat(vec![ModelMessage::User(prompt(raw))], self.parameters.clone())
            .await?;

        let json = strip_code_fences(&resp.text);
        serde_json::from_str(json).map_err(|err| {
            error!("failed to parse the extracted invoice: {err}");
            error!("model answered: {json}");
            ApiError::Parse(err.to_string())
        })
    }
}

fn prompt(raw: &str) -> String {
    format!(
        "Analiza la informacion del texto: '{raw}' y extrae los datos en formato JSON con esta estructura exacta: \
         {{\"cliente\": \"nombre del cliente\", \"fecha\": \"fecha de la factura\", \"total\": monto numerico, \"productos\": [\"producto1\", \"producto2\"]}}. \
         Responde SOLO con el JSON, sin texto adicional."
    )
}

/// Removes the Markdown fences models like to wrap JSON in.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}
