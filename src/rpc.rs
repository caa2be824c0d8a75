//! Line-delimited JSON-RPC facade.
//!
//! One request per line, one response per line, served over any
//! `BufRead`/`Write` pair (stdio in practice). Every failure, including
//! an unrecognized method, maps to the generic internal-error code;
//! callers distinguish cases by the message text.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::adapter;
use crate::error::{Result, VaultError};
use crate::export;
use crate::model::Message;
use crate::readpst::ArchiveTool;

const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PathParams {
    path: PathBuf,
}

/// Shared parameter shape of every export method. Messages may arrive
/// inline as canonical objects or as paths to load.
#[derive(Debug, Default, Deserialize)]
struct ExportParams {
    #[serde(default)]
    messages: Option<Vec<Message>>,
    #[serde(default)]
    paths: Option<Vec<PathBuf>>,
    #[serde(default)]
    dest: Option<PathBuf>,
    #[serde(default)]
    source: String,
    #[serde(default)]
    show_attachments: bool,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    output_text: Option<PathBuf>,
    #[serde(default)]
    text_path: Option<PathBuf>,
    #[serde(default)]
    write_json: bool,
    #[serde(default)]
    json_path: Option<PathBuf>,
    #[serde(default)]
    write_hashes: bool,
    #[serde(default)]
    hashes_path: Option<PathBuf>,
}

/// JSON-RPC server over the mailvault operations.
pub struct RpcServer<T> {
    tool: T,
}

impl<T: ArchiveTool> RpcServer<T> {
    pub fn new(tool: T) -> Self {
        Self { tool }
    }

    /// Serve requests until EOF or a `shutdown` request.
    pub fn serve<R: BufRead, W: Write>(&self, input: R, mut output: W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (response, stop) = self.process_line(line);
            let encoded = serde_json::to_string(&response).map_err(io::Error::from)?;
            writeln!(output, "{encoded}")?;
            output.flush()?;
            if stop {
                break;
            }
        }
        Ok(())
    }

    fn process_line(&self, line: &str) -> (Value, bool) {
        let request: Request = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => return (error_response(Value::Null, &e.to_string()), false),
        };

        let id = request.id.unwrap_or(Value::Null);
        let method = request.method.unwrap_or_default();
        let params = request.params.unwrap_or_else(|| json!({}));
        debug!(method = %method, "Handling request");

        match self.dispatch(&method, params) {
            Ok(result) => {
                let stop = method == "shutdown";
                (
                    json!({"jsonrpc": "2.0", "id": id, "result": result}),
                    stop,
                )
            }
            Err(e) => (error_response(id, &e.to_string()), false),
        }
    }

    fn dispatch(&self, method: &str, params: Value) -> Result<Value> {
        match method {
            "ping" => Ok(json!("pong")),
            "shutdown" => {
                info!("Shutdown requested");
                Ok(json!({"status": "closing"}))
            }
            "load_mailbox" => self.handle_load_mailbox(params),
            "load_message" => handle_load_message(params),
            "export_text" => handle_export_text(params),
            "export_json" => handle_export_json(params),
            "export_hashes" => handle_export_hashes(params),
            "export_bundle" => handle_export_bundle(params),
            other => Err(VaultError::InvalidRequest(format!(
                "Unknown method: {other}"
            ))),
        }
    }

    fn handle_load_mailbox(&self, params: Value) -> Result<Value> {
        let p: PathParams = parse_params(params)?;
        let mailbox = adapter::load_mailbox(&p.path, &self.tool)?;
        Ok(mailbox.to_value()?)
    }
}

fn handle_load_message(params: Value) -> Result<Value> {
    let p: PathParams = parse_params(params)?;
    let message = adapter::load_single_message(&p.path)?;
    Ok(serde_json::to_value(message)?)
}

fn handle_export_text(params: Value) -> Result<Value> {
    let p: ExportParams = parse_params(params)?;
    let messages = messages_from_params(&p)?;
    let dest = required_path(p.dest.as_deref(), "dest")?;
    let encoding = p.encoding.as_deref().unwrap_or("utf-8");
    export::export_text(&messages, dest, &p.source, p.show_attachments, encoding)?;
    Ok(json!({"written": dest.display().to_string()}))
}

fn handle_export_json(params: Value) -> Result<Value> {
    let p: ExportParams = parse_params(params)?;
    let messages = messages_from_params(&p)?;
    let dest = required_path(p.dest.as_deref(), "dest")?;
    export::export_json(&messages, dest, &p.source, p.output_text.as_deref())?;
    Ok(json!({"written": dest.display().to_string()}))
}

fn handle_export_hashes(params: Value) -> Result<Value> {
    let p: ExportParams = parse_params(params)?;
    let messages = messages_from_params(&p)?;
    let dest = required_path(p.dest.as_deref(), "dest")?;
    export::export_hashes(&messages, dest)?;
    Ok(json!({"written": dest.display().to_string()}))
}

fn handle_export_bundle(params: Value) -> Result<Value> {
    let p: ExportParams = parse_params(params)?;
    let messages = messages_from_params(&p)?;
    if messages.is_empty() {
        return Err(VaultError::InvalidRequest(
            "No messages provided for export".to_string(),
        ));
    }

    let text_path = required_path(p.text_path.as_deref(), "text_path")?;
    let encoding = p.encoding.as_deref().unwrap_or("utf-8");
    export::export_text(&messages, text_path, &p.source, p.show_attachments, encoding)?;
    let mut result = json!({"text": text_path.display().to_string()});

    if p.write_json {
        if let Some(json_path) = &p.json_path {
            export::export_json(&messages, json_path, &p.source, Some(text_path))?;
            result["json"] = json!(json_path.display().to_string());
        }
    }
    if p.write_hashes {
        if let Some(hashes_path) = &p.hashes_path {
            export::export_hashes(&messages, hashes_path)?;
            result["hashes"] = json!(hashes_path.display().to_string());
        }
    }
    Ok(result)
}

fn messages_from_params(params: &ExportParams) -> Result<Vec<Message>> {
    if let Some(messages) = &params.messages {
        if !messages.is_empty() {
            return Ok(messages.clone());
        }
    }
    let paths = params.paths.clone().unwrap_or_default();
    adapter::load_messages_from_files(&paths)
}

fn parse_params<P: DeserializeOwned>(params: Value) -> Result<P> {
    serde_json::from_value(params)
        .map_err(|e| VaultError::InvalidRequest(format!("Invalid parameters: {e}")))
}

fn required_path<'a>(path: Option<&'a Path>, name: &str) -> Result<&'a Path> {
    path.ok_or_else(|| {
        VaultError::InvalidRequest(format!("Missing required parameter: {name}"))
    })
}

fn error_response(id: Value, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {"code": INTERNAL_ERROR, "message": message},
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct NoTool;

    impl ArchiveTool for NoTool {
        fn resolve(&self) -> Option<PathBuf> {
            None
        }

        fn run(&self, _archive: &Path, _out_dir: &Path) -> Result<Vec<PathBuf>> {
            Err(VaultError::ToolUnavailable("readpst".to_string()))
        }
    }

    fn serve_lines(input: &str) -> Vec<Value> {
        let server = RpcServer::new(NoTool);
        let mut output = Vec::new();
        server.serve(Cursor::new(input), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_ping() {
        let responses = serve_lines("{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":1}\n");
        assert_eq!(
            responses,
            vec![json!({"jsonrpc": "2.0", "id": 1, "result": "pong"})]
        );
    }

    #[test]
    fn test_unknown_method() {
        let responses = serve_lines("{\"method\":\"frobnicate\",\"id\":7}\n");
        assert_eq!(responses[0]["error"]["code"], INTERNAL_ERROR);
        assert_eq!(
            responses[0]["error"]["message"],
            "Unknown method: frobnicate"
        );
        assert_eq!(responses[0]["id"], 7);
    }

    #[test]
    fn test_invalid_json_line() {
        let responses = serve_lines("this is not json\n");
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["code"], INTERNAL_ERROR);
    }

    #[test]
    fn test_shutdown_stops_serving() {
        let responses =
            serve_lines("{\"method\":\"shutdown\",\"id\":1}\n{\"method\":\"ping\",\"id\":2}\n");
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["result"]["status"], "closing");
    }

    #[test]
    fn test_blank_lines_skipped() {
        let responses = serve_lines("\n\n{\"method\":\"ping\",\"id\":3}\n");
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["result"], "pong");
    }

    #[test]
    fn test_export_bundle_rejects_empty() {
        let responses = serve_lines(
            "{\"method\":\"export_bundle\",\"id\":4,\"params\":{\"text_path\":\"/tmp/x.txt\"}}\n",
        );
        assert_eq!(
            responses[0]["error"]["message"],
            "No messages provided for export"
        );
    }

    #[test]
    fn test_export_text_from_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let eml = tmp.path().join("a.eml");
        std::fs::write(&eml, b"Subject: Hi\r\n\r\nBody here.\r\n").unwrap();
        let dest = tmp.path().join("out.txt");

        let request = json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "export_text",
            "params": {
                "paths": [eml.display().to_string()],
                "dest": dest.display().to_string(),
                "source": "/mail",
            },
        });
        let responses = serve_lines(&format!("{request}\n"));
        assert_eq!(
            responses[0]["result"]["written"],
            dest.display().to_string()
        );

        let text = std::fs::read_to_string(&dest).unwrap();
        assert!(text.contains("SUBJECT: Hi"));
        assert!(text.contains("Body here."));
    }

    #[test]
    fn test_load_message_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let eml = tmp.path().join("a.eml");
        std::fs::write(
            &eml,
            b"Subject: Hi\r\nMessage-ID: <x@y>\r\n\r\nBody here.\r\n",
        )
        .unwrap();

        let request = json!({
            "method": "load_message",
            "id": 6,
            "params": {"path": eml.display().to_string()},
        });
        let responses = serve_lines(&format!("{request}\n"));
        assert_eq!(responses[0]["result"]["subject"], "Hi");
        assert_eq!(responses[0]["result"]["id"], "<x@y>");
    }

    #[test]
    fn test_missing_dest_parameter() {
        let responses =
            serve_lines("{\"method\":\"export_hashes\",\"id\":8,\"params\":{\"paths\":[]}}\n");
        assert_eq!(
            responses[0]["error"]["message"],
            "Missing required parameter: dest"
        );
    }
}
