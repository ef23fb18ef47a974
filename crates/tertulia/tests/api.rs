use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};
use tertulia::config::{Settings, TrelloSettings};
use tertulia::trello::{BoardService, TrelloClient};
use tertulia::{AppState, Backends};
use tertulia_core::ModelClient;
use tertulia_core::retrieval::Embedder;
use tertulia_model::{ErrorKind, ModelMessage};
use tertulia_test_model::{
    PresetResponse, TestModelProvider, VocabularyEmbeddingProvider,
};
use tokio::net::TcpListener;

fn settings() -> Settings {
    Settings::from_toml_str(
        r#"
        [gemini]
        api_key = "test"

        [openai]
        api_key = "test"

        [rag]
        chunk_size = 40
        "#,
    )
    .unwrap()
}

fn board(base_url: &str) -> Arc<dyn BoardService> {
    Arc::new(TrelloClient::new(TrelloSettings {
        base_url: base_url.to_owned(),
        api_key: "key".to_owned(),
        token: "token".to_owned(),
        board_id: "board".to_owned(),
    }))
}

struct TestApp {
    url: String,
    state: AppState,
    http: reqwest::Client,
}

impl TestApp {
    async fn spawn(
        assistant_model: &TestModelProvider,
        openai_model: &TestModelProvider,
        board: Arc<dyn BoardService>,
    ) -> Self {
        let backends = Backends {
            assistant_model: ModelClient::new(assistant_model.clone()),
            openai_model: ModelClient::new(openai_model.clone()),
            embedder: Embedder::new(VocabularyEmbeddingProvider::new([
                "ceo", "pandebono", "vacaciones", "días",
            ])),
            board,
        };
        let state = AppState::assemble(&settings(), backends).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = tertulia::router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
            http: reqwest::Client::new(),
        }
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> reqwest::Response {
        self.http
            .get(format!("{}{path}", self.url))
            .query(query)
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_ping() {
    let model = TestModelProvider::default();
    let app = TestApp::spawn(&model, &model, board("http://127.0.0.1:9")).await;
    let resp = app.get("/api/v1/ping", &[]).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "pong");
}

#[tokio::test]
async fn test_blank_input_never_reaches_the_model() {
    let assistant_model = TestModelProvider::default();
    let openai_model = TestModelProvider::default();
    let app =
        TestApp::spawn(&assistant_model, &openai_model, board("http://127.0.0.1:9"))
            .await;

    let cases = [
        ("/chat", "message"),
        ("/api/rag/ask", "query"),
        ("/api/v1/manual/explain", "topic"),
        ("/api/v1/facturas/extraer", "factura"),
    ];
    for (path, param) in cases {
        for value in [None, Some(""), Some("   ")] {
            let query: Vec<_> = value.map(|value| (param, value)).into_iter().collect();
            let resp = app.get(path, &query).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{path} {value:?}");
            let body: Value = resp.json().await.unwrap();
            assert_eq!(body["status"], 400);
            assert!(body["message"].as_str().unwrap().contains(param));
        }
    }
    assert_eq!(assistant_model.request_count(), 0);
    assert_eq!(openai_model.request_count(), 0);
}

#[tokio::test]
async fn test_chat_calls_the_sum_tool() {
    let mut assistant_model = TestModelProvider::default();
    assistant_model.add_response(PresetResponse::tool_call(
        "call_1",
        "sumar",
        json!({ "a": 2, "b": 3 }),
    ));
    assistant_model.add_response(PresetResponse::text(
        "Eso da 5, como cinco pandebonos recién horneados.",
    ));
    let openai_model = TestModelProvider::default();
    let app =
        TestApp::spawn(&assistant_model, &openai_model, board("http://127.0.0.1:9"))
            .await;

    let resp = app.get("/chat", &[("message", "2 + 3")]).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains('5'));

    let requests = assistant_model.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools.len(), 5);
    assert_eq!(requests[0].parameters.model_name.as_deref(), Some("gemini-2.5-flash"));
    let ModelMessage::Tool(result) = requests[1].messages.last().unwrap() else {
        panic!("expected the tool result");
    };
    assert_eq!(result.name, "sumar");
    assert_eq!(result.content, "5");
    assert_eq!(app.state.assistant.session_count().await, 1);
}

#[tokio::test]
async fn test_board_failure_reaches_the_model() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/1/cards")
        .match_query(mockito::Matcher::Any)
        .with_status(400)
        .with_body("invalid value for idList")
        .create_async()
        .await;

    let mut assistant_model = TestModelProvider::default();
    assistant_model.add_response(PresetResponse::tool_call(
        "call_1",
        "crearTarjeta",
        json!({ "idLista": "nope", "titulo": "Hornear", "descripcion": "" }),
    ));
    assistant_model.add_response(PresetResponse::text("No pude crear la tarjeta."));
    let openai_model = TestModelProvider::default();
    let app = TestApp::spawn(&assistant_model, &openai_model, board(&server.url())).await;

    let resp = app
        .get("/chat", &[("message", "crea una tarjeta"), ("session", "ana")])
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    mock.assert_async().await;

    let requests = assistant_model.requests();
    let ModelMessage::Tool(result) = requests[1].messages.last().unwrap() else {
        panic!("expected the tool result");
    };
    assert!(result.content.starts_with("Error al crear la tarjeta: 400"));
}

#[tokio::test]
async fn test_model_failure_is_a_server_error() {
    let mut assistant_model = TestModelProvider::default();
    assistant_model.add_failure(ErrorKind::Network);
    let openai_model = TestModelProvider::default();
    let app =
        TestApp::spawn(&assistant_model, &openai_model, board("http://127.0.0.1:9"))
            .await;

    let resp = app.get("/chat", &[("message", "hola")]).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], 500);
}

#[tokio::test]
async fn test_invoice_extraction() {
    let mut openai_model = TestModelProvider::default();
    openai_model.add_response(PresetResponse::text(
        "```json\n{\"cliente\": \"Ana\", \"fecha\": \"2026-01-15\", \"total\": 30.5, \
         \"productos\": [\"café\"]}\n```",
    ));
    openai_model.add_response(PresetResponse::text("{\"cliente\": \"Ana\", "));
    let assistant_model = TestModelProvider::default();
    let app =
        TestApp::spawn(&assistant_model, &openai_model, board("http://127.0.0.1:9"))
            .await;

    let resp = app
        .get("/api/v1/facturas/extraer", &[("factura", "Ana, café, 30.5")])
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "cliente": "Ana",
            "fecha": "2026-01-15",
            "total": 30.5,
            "productos": ["café"],
        })
    );

    let resp = app
        .get("/api/v1/facturas/extraer", &[("factura", "Ana, café, 30.5")])
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(!body["message"].as_str().unwrap().contains("EOF"));
}

#[tokio::test]
async fn test_explain() {
    let mut openai_model = TestModelProvider::default();
    openai_model
        .add_response(PresetResponse::text("Un borrow checker entra a un bar...").with_usage(9, 20));
    let assistant_model = TestModelProvider::default();
    let app =
        TestApp::spawn(&assistant_model, &openai_model, board("http://127.0.0.1:9"))
            .await;

    let resp = app.get("/api/v1/manual/explain", &[("topic", "Rust")]).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "Un borrow checker entra a un bar...");

    let request = &openai_model.requests()[0];
    assert_eq!(request.parameters.temperature, Some(1.0));
    assert_eq!(request.parameters.max_output_tokens, Some(50));
}

#[tokio::test]
async fn test_rag_answers_with_retrieved_context() {
    let mut openai_model = TestModelProvider::default();
    openai_model.add_response(PresetResponse::text("El CEO es Pandebono."));
    let assistant_model = TestModelProvider::default();
    let app =
        TestApp::spawn(&assistant_model, &openai_model, board("http://127.0.0.1:9"))
            .await;
    let count = app
        .state
        .rag
        .retriever()
        .ingest(
            "datos_empresa.txt",
            "El CEO de la empresa es Pandebono.      Cada empleado tiene 20 días de vacaciones.",
        )
        .await
        .unwrap();
    assert_eq!(count, 3);

    let resp = app.get("/api/rag/ask", &[("query", "¿Quién es el CEO?")]).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "El CEO es Pandebono.");

    let request = &openai_model.requests()[0];
    assert!(request.tools.is_empty());
    assert_eq!(request.parameters.max_output_tokens, Some(100));
    let ModelMessage::System(context) = &request.messages[0] else {
        panic!("expected the retrieved context");
    };
    assert!(context.contains("Pandebono"));
    assert!(!context.contains("vacaciones"));
}
