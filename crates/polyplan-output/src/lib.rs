//! Output formatting for polyplan commands.
//!
//! Every report implements [`OutputFormatter`] and can be printed as compact
//! text, pretty text, JSON, JSON Lines, or JSON filtered through a jq
//! expression.

use nu_ansi_term::Color;
use serde::{Deserialize, Serialize};
use std::io::{IsTerminal, Write};

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("jq: {0}")]
    Jq(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Color output mode.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Auto-detect based on TTY (default)
    #[default]
    Auto,
    Always,
    Never,
}

/// `[pretty]` section of the config file.
///
/// ```toml
/// [pretty]
/// enabled = true     # default: auto (true when stdout is a TTY)
/// colors = "auto"    # "auto", "always", or "never"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(default)]
pub struct PrettyConfig {
    pub enabled: Option<bool>,
    pub colors: Option<ColorMode>,
}

impl PrettyConfig {
    /// Layer `other` over `self`; values set in `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            enabled: other.enabled.or(self.enabled),
            colors: other.colors.or(self.colors),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
            .unwrap_or_else(|| std::io::stdout().is_terminal())
    }

    /// Respects `NO_COLOR`. An explicit `--pretty` (`forced`) overrides the
    /// TTY check in `auto` mode.
    pub fn use_colors(&self, forced: bool) -> bool {
        if std::env::var_os("NO_COLOR").is_some() {
            return false;
        }
        match self.colors.unwrap_or_default() {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => forced || std::io::stdout().is_terminal(),
        }
    }
}

/// Output format and display mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text, no colors.
    #[default]
    Compact,
    /// Human-friendly text, colored if enabled.
    Pretty { colors: bool },
    Json,
    /// One JSON value per line; arrays emit one line per element.
    JsonLines,
    /// JSON filtered through a jq expression.
    Jq { filter: String, jsonl: bool },
}

impl OutputFormat {
    /// Resolve CLI flags against the config. JSON modes take precedence
    /// over text modes; `--compact` beats `--pretty`.
    pub fn from_cli(
        json: bool,
        jsonl: bool,
        jq: Option<&str>,
        pretty: bool,
        compact: bool,
        config: &PrettyConfig,
    ) -> Self {
        if let Some(filter) = jq {
            return OutputFormat::Jq {
                filter: filter.to_string(),
                jsonl,
            };
        }
        if jsonl {
            return OutputFormat::JsonLines;
        }
        if json {
            return OutputFormat::Json;
        }

        if compact || !(pretty || config.enabled()) {
            return OutputFormat::Compact;
        }

        OutputFormat::Pretty {
            colors: config.use_colors(pretty),
        }
    }
}

/// A report that can be rendered in every [`OutputFormat`].
pub trait OutputFormatter: Serialize + schemars::JsonSchema {
    /// Plain text rendering (the default format).
    fn format_text(&self) -> String;

    /// Human-friendly rendering. Falls back to `format_text()`.
    fn format_pretty(&self, _colors: bool) -> String {
        self.format_text()
    }

    /// Render into `out`.
    fn write_to(&self, format: &OutputFormat, out: &mut dyn Write) -> Result<(), OutputError> {
        match format {
            OutputFormat::Compact => writeln!(out, "{}", self.format_text())?,
            OutputFormat::Pretty { colors } => writeln!(out, "{}", self.format_pretty(*colors))?,
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(self)?)?,
            OutputFormat::JsonLines => write_jsonl(&serde_json::to_value(self)?, out)?,
            OutputFormat::Jq { filter, jsonl } => {
                let value = serde_json::to_value(self)?;
                for line in apply_jq(&value, filter)? {
                    if *jsonl
                        && let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&line)
                    {
                        write_jsonl(&parsed, out)?;
                    } else {
                        writeln!(out, "{}", line)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Print to stdout.
    fn print(&self, format: &OutputFormat) -> Result<(), OutputError> {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.write_to(format, &mut lock)
    }
}

fn write_jsonl(value: &serde_json::Value, out: &mut dyn Write) -> Result<(), OutputError> {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                writeln!(out, "{}", serde_json::to_string(item)?)?;
            }
        }
        other => writeln!(out, "{}", serde_json::to_string(other)?)?,
    }
    Ok(())
}

/// Pretty-printed JSON schema for `T`.
pub fn schema_json<T: schemars::JsonSchema>() -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(&schemars::schema_for!(T))?)
}

/// Apply a jq filter to a JSON value, one output string per result.
pub fn apply_jq(value: &serde_json::Value, filter: &str) -> Result<Vec<String>, OutputError> {
    use jaq_core::load::{Arena, File as JaqFile, Loader};
    use jaq_core::{Compiler, Ctx, RcIter};
    use jaq_json::Val;

    let loader = Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = Arena::default();
    let program = JaqFile {
        code: filter,
        path: (),
    };

    let modules = loader
        .load(&arena, program)
        .map_err(|errs| OutputError::Jq(format!("parse error: {:?}", errs)))?;
    let compiled = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(|errs| OutputError::Jq(format!("compile error: {:?}", errs)))?;

    let inputs = RcIter::new(core::iter::empty());
    let out = compiled.run((Ctx::new([], &inputs), Val::from(value.clone())));

    out.map(|result| {
        result
            .map(|v| v.to_string())
            .map_err(|e| OutputError::Jq(format!("runtime error: {:?}", e)))
    })
    .collect()
}

/// Color for a resolution strategy name.
pub fn strategy_color(strategy: &str) -> Color {
    match strategy {
        "native" => Color::Green,
        "polyfill" => Color::Yellow,
        "transform" => Color::Cyan,
        _ => Color::Red,
    }
}

/// Paint `text` in the strategy's color when `colors` is set.
pub fn paint_strategy(strategy: &str, text: &str, colors: bool) -> String {
    if colors {
        strategy_color(strategy).paint(text).to_string()
    } else {
        text.to_string()
    }
}

/// Bold when `colors` is set.
pub fn heading(text: &str, colors: bool) -> String {
    if colors {
        Color::Default.bold().paint(text).to_string()
    } else {
        text.to_string()
    }
}

/// Dimmed when `colors` is set.
pub fn dimmed(text: &str, colors: bool) -> String {
    if colors {
        Color::DarkGray.paint(text).to_string()
    } else {
        text.to_string()
    }
}

/// Human-readable byte size: `812 B`, `9.6 KiB`, `1.2 MiB`.
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{} B", bytes)
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / (KIB * KIB))
    }
}

/// Block-character bar for a share in percent (0 to 100).
pub fn share_bar(percent: f64, width: usize) -> String {
    let ratio = (percent / 100.0).clamp(0.0, 1.0);
    let filled = (ratio * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, schemars::JsonSchema)]
    struct Report {
        modules: Vec<String>,
    }

    impl OutputFormatter for Report {
        fn format_text(&self) -> String {
            self.modules.join("\n")
        }
    }

    fn render(report: &Report, format: OutputFormat) -> String {
        let mut buf = Vec::new();
        report.write_to(&format, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn report() -> Report {
        Report {
            modules: vec!["core-js/es.symbol".into(), "core-js/es.promise".into()],
        }
    }

    #[test]
    fn test_output_format_from_cli() {
        let config = PrettyConfig::default();
        assert_eq!(
            OutputFormat::from_cli(false, false, None, false, true, &config),
            OutputFormat::Compact
        );
        assert_eq!(
            OutputFormat::from_cli(true, false, None, false, false, &config),
            OutputFormat::Json
        );
        // jsonl takes precedence over json
        assert_eq!(
            OutputFormat::from_cli(true, true, None, false, false, &config),
            OutputFormat::JsonLines
        );
        assert_eq!(
            OutputFormat::from_cli(true, true, Some(".modules"), false, false, &config),
            OutputFormat::Jq {
                filter: ".modules".to_string(),
                jsonl: true
            }
        );
        let never = PrettyConfig {
            colors: Some(ColorMode::Never),
            ..Default::default()
        };
        assert_eq!(
            OutputFormat::from_cli(false, false, None, true, false, &never),
            OutputFormat::Pretty { colors: false }
        );
    }

    #[test]
    fn test_write_formats() {
        assert_eq!(
            render(&report(), OutputFormat::Compact),
            "core-js/es.symbol\ncore-js/es.promise\n"
        );
        // No pretty rendering of its own: falls back to the text form.
        assert_eq!(
            render(&report(), OutputFormat::Pretty { colors: true }),
            render(&report(), OutputFormat::Compact)
        );
        assert_eq!(
            render(&report(), OutputFormat::Json),
            "{\"modules\":[\"core-js/es.symbol\",\"core-js/es.promise\"]}\n"
        );
        assert_eq!(
            render(
                &report(),
                OutputFormat::Jq {
                    filter: ".modules".into(),
                    jsonl: true
                }
            ),
            "\"core-js/es.symbol\"\n\"core-js/es.promise\"\n"
        );
    }

    #[test]
    fn test_apply_jq() {
        let value = serde_json::json!({"modules": ["a", "b"], "total": 2});
        assert_eq!(apply_jq(&value, ".total").unwrap(), vec!["2"]);
        assert_eq!(
            apply_jq(&value, ".modules[]").unwrap(),
            vec!["\"a\"", "\"b\""]
        );
        assert!(matches!(apply_jq(&value, ".[[["), Err(OutputError::Jq(_))));
    }

    #[test]
    fn test_pretty_config_merge() {
        let global = PrettyConfig {
            enabled: Some(true),
            colors: Some(ColorMode::Always),
        };
        let project = PrettyConfig {
            colors: Some(ColorMode::Never),
            ..Default::default()
        };
        let merged = global.merge(project);
        assert_eq!(merged.enabled, Some(true));
        assert_eq!(merged.colors, Some(ColorMode::Never));
        assert!(!merged.use_colors(true));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(812), "812 B");
        assert_eq!(format_size(9830), "9.6 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn test_share_bar() {
        assert_eq!(share_bar(50.0, 4), "██░░");
        assert_eq!(share_bar(250.0, 2), "██");
        assert_eq!(share_bar(-1.0, 2), "░░");
    }

    #[test]
    fn test_paint_without_colors_is_plain() {
        assert_eq!(paint_strategy("native", "ok", false), "ok");
        assert_ne!(paint_strategy("unsupported", "x", true), "x");
    }
}
