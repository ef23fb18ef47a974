use std::future::ready;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tertulia_core::tool::{Tool, ToolResult, parameter_schema_for};

#[derive(Deserialize, JsonSchema)]
pub struct Operands {
    #[schemars(description = "Primer número.")]
    a: f64,
    #[schemars(description = "Segundo número.")]
    b: f64,
}

/// Adds two numbers.
pub struct SumTool {
    parameter_schema: Value,
}

impl SumTool {
    #[inline]
    pub fn new() -> Self {
        SumTool {
            parameter_schema: parameter_schema_for::<Operands>(),
        }
    }
}

impl Default for SumTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for SumTool {
    type Input = Operands;

    fn name(&self) -> &str {
        "sumar"
    }

    fn description(&self) -> &str {
        "Calcula la suma de dos números"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: Operands,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        info!("using `sumar` for {} + {}", input.a, input.b);
        ready(Ok((input.a + input.b).to_string()))
    }
}

/// Multiplies two numbers.
pub struct MultiplyTool {
    parameter_schema: Value,
}

impl MultiplyTool {
    #[inline]
    pub fn new() -> Self {
        MultiplyTool {
            parameter_schema: parameter_schema_for::<Operands>(),
        }
    }
}

impl Default for MultiplyTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for MultiplyTool {
    type Input = Operands;

    fn name(&self) -> &str {
        "multiplicar"
    }

    fn description(&self) -> &str {
        "Calcula la multiplicación de dos números"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: Operands,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        info!("using `multiplicar` for {} * {}", input.a, input.b);
        ready(Ok((input.a * input.b).to_string()))
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct Word {
    #[schemars(description = "La palabra a medir.")]
    palabra: String,
}

/// Counts the characters of a word.
pub struct CountLettersTool {
    parameter_schema: Value,
}

impl CountLettersTool {
    #[inline]
    pub fn new() -> Self {
        CountLettersTool {
            parameter_schema: parameter_schema_for::<Word>(),
        }
    }
}

impl Default for CountLettersTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for CountLettersTool {
    type Input = Word;

    fn name(&self) -> &str {
        "contarLetras"
    }

    fn description(&self) -> &str {
        "Obtiene la longitud de una palabra"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: Word,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        debug!("using `contarLetras` for `{}`", input.palabra);
        ready(Ok(input.palabra.chars().count().to_string()))
    }
}
