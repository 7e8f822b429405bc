use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::Value;

/// Lines returned per page by [`ReadFilePage`].
pub const PAGE_LINES: usize = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// The in-band outcome of a tool call. Tools report failure here instead of
/// returning an error, so the agent loop can react to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub output: String,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            output: output.into(),
        }
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }
}

/// A function a backend may call on the model's behalf during one inference call.
pub trait Tool: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;

    /// Never fails out-of-band; see [`ToolResult`].
    fn call(&self, args: &Value) -> ToolResult;
}

type ToolFn = dyn Fn(&Value) -> ToolResult + Send + Sync;

/// Adapts a closure into a [`Tool`].
#[derive(Clone)]
pub struct FnTool {
    name: String,
    description: String,
    parameters: Value,
    func: Arc<ToolFn>,
}

impl FnTool {
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        func: F,
    ) -> Self
    where
        F: Fn(&Value) -> ToolResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            func: Arc::new(func),
        }
    }
}

impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    fn call(&self, args: &Value) -> ToolResult {
        (self.func)(args)
    }
}

/// Lists the entries of a directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFiles;

impl Tool for ListFiles {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List all files in the given directory."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "directory": { "type": "string", "description": "The directory to list files from." }
            },
            "required": ["directory"]
        })
    }

    fn call(&self, args: &Value) -> ToolResult {
        let Some(directory) = args.get("directory").and_then(Value::as_str) else {
            return ToolResult::error("Missing argument 'directory'.");
        };
        log::debug!("Tool list_files called for {}", directory);

        let dir = Path::new(directory);
        if !dir.is_dir() {
            return ToolResult::error(format!("Directory {} does not exist.", directory));
        }

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        let mut lines = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    let (kind, size) = match entry.metadata() {
                        Ok(meta) if meta.is_dir() => ("dir", 0),
                        Ok(meta) => ("file", meta.len()),
                        Err(_) => ("unknown", 0),
                    };
                    lines.push(format!("{}\t{}\t{}", kind, size, name));
                }
                Err(e) => return ToolResult::error(e.to_string()),
            }
        }
        lines.sort();
        ToolResult::success(lines.join("\n"))
    }
}

/// Reads a text file one page of [`PAGE_LINES`] lines at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadFilePage;

impl Tool for ReadFilePage {
    fn name(&self) -> &str {
        "cat_file"
    }

    fn description(&self) -> &str {
        "Read a file and return its content. Each page contains 250 lines or EOF."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string", "description": "The path to the file to read." },
                "page": { "type": "integer", "description": "The page number to read (0-based)." }
            },
            "required": ["file_path", "page"]
        })
    }

    fn call(&self, args: &Value) -> ToolResult {
        let Some(file_path) = args.get("file_path").and_then(Value::as_str) else {
            return ToolResult::error("Missing argument 'file_path'.");
        };
        let page = match args.get("page").and_then(Value::as_i64) {
            Some(page) if page < 0 => {
                return ToolResult::error("Page number must be non-negative.");
            }
            Some(page) => page as usize,
            None => return ToolResult::error("Missing argument 'page'."),
        };
        log::debug!("Tool cat_file called for {}, page {}", file_path, page);

        let path = Path::new(file_path);
        if !path.is_file() {
            return ToolResult::error(format!("File {} does not exist.", file_path));
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        let start = match page.checked_mul(PAGE_LINES) {
            Some(start) if start < lines.len() => start,
            _ => return ToolResult::error("End of file reached."),
        };
        let end = (start + PAGE_LINES).min(lines.len());
        ToolResult::success(lines[start..end].concat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_tool_result_serializes_lowercase_status() {
        let value = serde_json::to_value(ToolResult::error("boom")).unwrap();
        assert_eq!(value, json!({"status": "error", "output": "boom"}));
    }

    #[test]
    fn test_list_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let result = ListFiles.call(&json!({"directory": dir.path().to_str().unwrap()}));
        assert!(result.is_success());
        assert!(result.output.contains("file\t5\ta.txt"));
        assert!(result.output.contains("dir\t0\tsub"));
    }

    #[test]
    fn test_list_files_missing_directory_is_in_band() {
        let result = ListFiles.call(&json!({"directory": "/definitely/not/here"}));
        assert_eq!(result.status, ToolStatus::Error);
        assert!(result.output.contains("does not exist"));
    }

    #[test]
    fn test_read_file_pages() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..300 {
            writeln!(file, "line {}", i).unwrap();
        }
        let path = file.path().to_str().unwrap().to_string();

        let first = ReadFilePage.call(&json!({"file_path": path, "page": 0}));
        assert!(first.is_success());
        assert_eq!(first.output.lines().count(), PAGE_LINES);
        assert!(first.output.starts_with("line 0\n"));

        let second = ReadFilePage.call(&json!({"file_path": path, "page": 1}));
        assert_eq!(second.output.lines().count(), 50);
        assert!(second.output.starts_with("line 250\n"));

        let past_end = ReadFilePage.call(&json!({"file_path": path, "page": 2}));
        assert_eq!(past_end, ToolResult::error("End of file reached."));
    }

    #[test]
    fn test_read_file_huge_page_is_in_band() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "only line").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let result = ReadFilePage.call(&json!({"file_path": path, "page": 100_000_000_000_000_000i64}));
        assert_eq!(result, ToolResult::error("End of file reached."));
    }

    #[test]
    fn test_read_file_negative_page() {
        let result = ReadFilePage.call(&json!({"file_path": "/tmp/x", "page": -1}));
        assert_eq!(result, ToolResult::error("Page number must be non-negative."));
    }

    #[test]
    fn test_fn_tool() {
        let tool = FnTool::new("echo", "Echo the input", json!({"type": "object"}), |args| {
            ToolResult::success(args.to_string())
        });
        assert_eq!(tool.name(), "echo");
        assert_eq!(tool.call(&json!({"a": 1})).output, "{\"a\":1}");
    }
}
