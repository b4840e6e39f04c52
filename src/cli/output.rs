//! User-facing output for the CLI: colored item listings and JSON reports.

use std::io::{self, IsTerminal, Write};

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::collection::{CollectError, CollectedItem};
use crate::plugin::MARKER_HELP;

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub items: &'a [CollectedItem],
    pub errors: &'a [CollectError],
}

pub fn stdout() -> StandardStream {
    let choice = if io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Writes one line per item, then a pytest-style summary line.
pub fn write_items<W: WriteColor>(
    out: &mut W,
    items: &[CollectedItem],
    errors: &[CollectError],
) -> io::Result<()> {
    for item in items {
        out.set_color(ColorSpec::new().set_bold(true))?;
        write!(out, "{}", item.nodeid)?;
        out.reset()?;
        if item.is_xfail() {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            write!(out, " XFAIL")?;
            out.reset()?;
        }
        if item.is_skipped() {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            write!(out, " SKIP")?;
            out.reset()?;
        }
        writeln!(out)?;
        for (name, value) in &item.params {
            let via = if item.indirect.iter().any(|n| n == name) {
                " (indirect)"
            } else {
                ""
            };
            writeln!(out, "    {name} = {value}{via}")?;
        }
    }
    write_summary(out, items.len(), errors.len())
}

fn write_summary<W: WriteColor>(out: &mut W, items: usize, errors: usize) -> io::Result<()> {
    let noun = if items == 1 { "item" } else { "items" };
    write!(out, "collected {items} {noun}")?;
    if errors > 0 {
        write!(out, " / ")?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        let noun = if errors == 1 { "error" } else { "errors" };
        write!(out, "{errors} {noun}")?;
        out.reset()?;
    }
    writeln!(out)
}

pub fn write_json<W: Write>(
    out: &mut W,
    items: &[CollectedItem],
    errors: &[CollectError],
) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, &Report { items, errors })?;
    writeln!(out)
}

pub fn write_markers<W: WriteColor>(out: &mut W) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
    write!(out, "@mark.")?;
    out.reset()?;
    writeln!(out, "{MARKER_HELP}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Mark, Scope};
    use crate::value::Value;
    use termcolor::Buffer;

    fn item(nodeid: &str, marks: Vec<Mark>) -> CollectedItem {
        CollectedItem {
            nodeid: nodeid.to_string(),
            function: "test_f".to_string(),
            params: [("a".to_string(), Value::from(1))].into_iter().collect(),
            marks,
            indirect: Vec::new(),
            scope: Scope::Function,
        }
    }

    fn render(items: &[CollectedItem], errors: &[CollectError]) -> String {
        let mut buffer = Buffer::no_color();
        write_items(&mut buffer, items, errors).unwrap();
        String::from_utf8(buffer.into_inner()).unwrap()
    }

    #[test]
    fn lists_items_with_params_and_marks() {
        let text = render(
            &[item("test_f[1]", vec![]), item("test_f[2]", vec![Mark::xfail()])],
            &[],
        );
        assert_eq!(
            text,
            "test_f[1]\n    a = 1\ntest_f[2] XFAIL\n    a = 1\ncollected 2 items\n"
        );
    }

    #[test]
    fn summary_counts_errors() {
        let errors = [CollectError {
            function: "test_g".to_string(),
            message: "boom".to_string(),
            pytrace: false,
        }];
        assert_eq!(render(&[], &errors), "collected 0 items / 1 error\n");
    }

    #[test]
    fn json_report_has_items_and_errors() {
        let mut out = Vec::new();
        write_json(&mut out, &[item("test_f[1]", vec![])], &[]).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["items"][0]["nodeid"], "test_f[1]");
        assert_eq!(json["items"][0]["params"]["a"], 1.0);
        assert_eq!(json["errors"], serde_json::json!([]));
    }
}
