//! 操作系统打印队列：枚举打印机并提交 PDF 作业
//!
//! Unix 走 CUPS（`lpstat` / `lp`），Windows 走 PowerShell。

use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{PrintError, Result};
use crate::print_pipeline::options::{DuplexMode, PrintSettings};
use crate::print_pipeline::printers::Printer;

pub const JOB_TITLE: &str = "Patient Care";

#[derive(Debug, Clone, Default)]
pub struct SystemSpooler;

impl SystemSpooler {
    pub fn new() -> Self {
        Self
    }

    #[cfg(not(target_os = "windows"))]
    pub async fn printers(&self) -> Result<Vec<Printer>> {
        let destinations = match run("lpstat", &["-e"], None).await {
            Ok(stdout) => parse_lpstat_destinations(&stdout),
            Err(e) if e.to_string().contains("No destinations") => Vec::new(),
            Err(e) => return Err(e),
        };
        // 没有默认打印机时 lpstat -d 可能以非零状态退出
        let default = run("lpstat", &["-d"], None)
            .await
            .ok()
            .and_then(|stdout| parse_lpstat_default(&stdout));

        Ok(destinations
            .into_iter()
            .map(|name| {
                let mut printer = Printer::named(name);
                printer.is_default = default.as_deref() == Some(printer.name.as_str());
                printer
            })
            .collect())
    }

    #[cfg(target_os = "windows")]
    pub async fn printers(&self) -> Result<Vec<Printer>> {
        let stdout = run(
            "powershell",
            &[
                "-NoProfile",
                "-NonInteractive",
                "-Command",
                "Get-CimInstance -ClassName Win32_Printer | Select-Object Name,Default,Comment | ConvertTo-Json",
            ],
            None,
        )
        .await?;
        parse_windows_printers(&stdout)
    }

    #[cfg(not(target_os = "windows"))]
    pub async fn submit(&self, printer: &str, pdf: &[u8], settings: &PrintSettings) -> Result<()> {
        let args = lp_args(printer, settings, JOB_TITLE);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let stdout = run("lp", &args, Some(pdf)).await?;
        tracing::debug!(printer, response = stdout.trim(), "job accepted by CUPS");
        Ok(())
    }

    #[cfg(target_os = "windows")]
    pub async fn submit(&self, printer: &str, pdf: &[u8], settings: &PrintSettings) -> Result<()> {
        use std::io::Write;

        let mut staged = tempfile::Builder::new()
            .prefix("patientcare-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| PrintError::filesystem("Failed to stage print job", e))?;
        staged
            .write_all(pdf)
            .map_err(|e| PrintError::filesystem("Failed to stage print job", e))?;

        let script = format!(
            "for ($i = 0; $i -lt {copies}; $i++) {{ Start-Process -FilePath '{file}' -Verb PrintTo -ArgumentList '\"{printer}\"' -Wait }}",
            copies = settings.copies,
            file = ps_quote(&staged.path().to_string_lossy()),
            printer = ps_quote(printer),
        );
        run("powershell", &["-NoProfile", "-NonInteractive", "-Command", &script], None).await?;
        Ok(())
    }
}

async fn run(program: &str, args: &[&str], stdin: Option<&[u8]>) -> Result<String> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| PrintError::Print(format!("Failed to run {}: {}", program, e)))?;

    if let (Some(bytes), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(bytes)
            .await
            .map_err(|e| PrintError::Print(format!("Failed to send job to {}: {}", program, e)))?;
        drop(pipe);
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| PrintError::Print(format!("Failed to run {}: {}", program, e)))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(PrintError::Print(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

/// `lpstat -e`：每行一个目标名称
pub fn parse_lpstat_destinations(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// `lpstat -d`：`system default destination: NAME`
pub fn parse_lpstat_default(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        let (_, name) = line.split_once("default destination:")?;
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}

/// PDF 已按页码范围和方向渲染，这里只传递打印机端的选项
pub fn lp_args(printer: &str, settings: &PrintSettings, title: &str) -> Vec<String> {
    let mut args = vec![
        "-d".to_string(),
        printer.to_string(),
        "-n".to_string(),
        settings.copies.to_string(),
        "-t".to_string(),
        title.to_string(),
    ];

    if let Some(duplex) = settings.duplex_mode {
        let sides = match duplex {
            DuplexMode::Simplex => "one-sided",
            DuplexMode::LongEdge => "two-sided-long-edge",
            DuplexMode::ShortEdge => "two-sided-short-edge",
        };
        args.push("-o".to_string());
        args.push(format!("sides={}", sides));
    }
    if !settings.color {
        args.push("-o".to_string());
        args.push("print-color-mode=monochrome".to_string());
    }
    if settings.copies > 1 {
        args.push("-o".to_string());
        args.push(format!("collate={}", settings.collate));
    }

    args.push("-".to_string());
    args
}

/// `ConvertTo-Json` 只有一台打印机时输出对象而不是数组
pub fn parse_windows_printers(stdout: &str) -> Result<Vec<Printer>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let value: serde_json::Value = serde_json::from_str(trimmed)?;
    let entries = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    Ok(entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("Name")?.as_str()?;
            let mut printer = Printer::named(name);
            printer.is_default = entry
                .get("Default")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            printer.description = entry
                .get("Comment")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some(printer)
        })
        .collect())
}

#[cfg(target_os = "windows")]
fn ps_quote(value: &str) -> String {
    value.replace('\'', "''")
}
