//! Line-oriented front end over a [`Session`]: the interactive tool without a
//! browser. Files can be named by their listing number or by full name, which
//! may contain spaces. Paths with spaces go in double quotes.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use sqlz_core::error::{Result, SqlzError};
use sqlz_core::{ProgressStatus, Session, format_size};

use crate::application::handlers::load_inputs;

const HELP: &str = "\
commands:
  add <path>...         add .sql files, .zip archives or directories
                        (quote paths that contain spaces)
  ls                    list files with status and sizes
  rm <file>             remove a file (number from ls or name)
  clear                 remove everything
  compress              compress every file not yet compressed
  preview <file>        show original and minified text
  save <dir> <file>     write compressed_<name>.gz into dir
  bundle <dir>          write sql_compressed.zip into dir
  stats                 totals and savings
  help                  this text
  quit                  leave";

/// Runs until `quit` or end of input. Command errors are printed and the
/// session carries on; only failures writing to `out` end the loop.
pub fn run<R: BufRead, W: Write>(session: &mut Session, input: R, out: &mut W) -> Result<()> {
    writeln!(out, "sqlz shell, type `help` for commands")?;
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };
        let outcome = match cmd {
            "quit" | "exit" => break,
            "help" => writeln!(out, "{HELP}").map_err(SqlzError::from),
            "add" => add(session, rest, out),
            "ls" => list(session, out),
            "rm" => remove(session, rest, out),
            "clear" => {
                session.clear();
                writeln!(out, "cleared").map_err(SqlzError::from)
            }
            "compress" => compress(session, out),
            "preview" => preview(session, rest, out),
            "save" => save(session, rest, out),
            "bundle" => bundle(session, rest, out),
            "stats" => writeln!(out, "{}", session.summary()).map_err(SqlzError::from),
            other => {
                writeln!(out, "unknown command `{other}`, try `help`").map_err(SqlzError::from)
            }
        };
        if let Err(e) = outcome {
            writeln!(out, "error: {e}")?;
        }
    }
    Ok(())
}

/// Splits on whitespace, keeping double-quoted runs together.
fn words(rest: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut word = String::new();
    let mut quoted = false;
    let mut started = false;
    for c in rest.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                started = true;
            }
            c if c.is_whitespace() && !quoted => {
                if started {
                    out.push(std::mem::take(&mut word));
                    started = false;
                }
            }
            c => {
                word.push(c);
                started = true;
            }
        }
    }
    if quoted {
        return Err(SqlzError::Format("unterminated quote".to_string()));
    }
    if started {
        out.push(word);
    }
    Ok(out)
}

/// `2` is the second listed file; anything else is taken as a name, with
/// surrounding quotes dropped.
fn resolve(session: &Session, arg: &str) -> Result<String> {
    let arg = arg
        .strip_prefix('"')
        .and_then(|a| a.strip_suffix('"'))
        .unwrap_or(arg);
    if arg.is_empty() {
        return Err(SqlzError::UnknownFile("(none given)".to_string()));
    }
    if let Ok(n) = arg.parse::<usize>() {
        if let Some(f) = n.checked_sub(1).and_then(|i| session.files().get(i)) {
            return Ok(f.name().to_string());
        }
    }
    session
        .file(arg)
        .map(|f| f.name().to_string())
        .ok_or_else(|| SqlzError::UnknownFile(arg.to_string()))
}

fn add<W: Write>(session: &mut Session, rest: &str, out: &mut W) -> Result<()> {
    let paths: Vec<PathBuf> = words(rest)?.into_iter().map(PathBuf::from).collect();
    let report = load_inputs(session, &paths)?;
    writeln!(out, "added {} file(s)", report.added.len())?;
    Ok(())
}

fn list<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    if session.is_empty() {
        writeln!(out, "no files")?;
        return Ok(());
    }
    for (i, f) in session.files().iter().enumerate() {
        let compressed = session
            .result(f.name())
            .map(|r| format_size(r.len()))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{:>3}. {:<40} {:>10} -> {:>10}  {}",
            i + 1,
            f.name(),
            format_size(f.size()),
            compressed,
            session.status(f.name())
        )?;
    }
    Ok(())
}

fn remove<W: Write>(session: &mut Session, rest: &str, out: &mut W) -> Result<()> {
    let name = resolve(session, rest)?;
    session.remove(&name);
    writeln!(out, "removed {name}")?;
    Ok(())
}

fn compress<W: Write>(session: &mut Session, out: &mut W) -> Result<()> {
    let mut lines = Vec::new();
    let report = session.compress_all(|name, status| {
        if matches!(status, ProgressStatus::Complete | ProgressStatus::Failed) {
            lines.push(format!("{name}: {status}"));
        }
    });
    for l in lines {
        writeln!(out, "{l}")?;
    }
    writeln!(
        out,
        "{} compressed, {} already done, {} failed",
        report.compressed.len(),
        report.skipped.len(),
        report.failed.len()
    )?;
    Ok(())
}

fn preview<W: Write>(session: &mut Session, rest: &str, out: &mut W) -> Result<()> {
    let name = resolve(session, rest)?;
    session.select(&name)?;
    let p = session.preview(&name)?;
    writeln!(out, "--- {} ({})", p.file.name(), format_size(p.file.size()))?;
    writeln!(out, "{}", p.original.trim_end())?;
    writeln!(out, "--- minified ({})", format_size(p.minified.len() as u64))?;
    writeln!(out, "{}", p.minified)?;
    if let Some(r) = p.result {
        writeln!(out, "--- gzip {}", format_size(r.len()))?;
    }
    Ok(())
}

fn save<W: Write>(session: &Session, rest: &str, out: &mut W) -> Result<()> {
    let mut args = words(rest)?.into_iter();
    let dir = args.next().unwrap_or_default();
    // Unquoted names with spaces arrive split; put them back together.
    let file = args.collect::<Vec<_>>().join(" ");
    let name = resolve(session, &file)?;
    let path = session.single(&name)?.save_to(Path::new(&dir))?;
    writeln!(out, "wrote {}", path.display())?;
    Ok(())
}

fn bundle<W: Write>(session: &Session, rest: &str, out: &mut W) -> Result<()> {
    let dir = words(rest)?.into_iter().next().unwrap_or_else(|| ".".to_string());
    let download = session.bundle()?;
    let path = download.save_to(Path::new(&dir))?;
    writeln!(
        out,
        "wrote {} ({} artifact(s), {})",
        path.display(),
        session.results().len(),
        format_size(download.len() as u64)
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlz_core::Blob;
    use std::io::Cursor;

    fn run_script(session: &mut Session, script: &str) -> String {
        let mut out = Vec::new();
        run(session, Cursor::new(script.as_bytes()), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn seeded() -> Session {
        let mut s = Session::default();
        s.intake(vec![
            Blob::from_bytes("a.sql", b"SELECT 1; -- one".to_vec()),
            Blob::from_bytes("b.sql", b"SELECT 2;".to_vec()),
        ])
        .unwrap();
        s
    }

    #[test]
    fn compress_then_list() {
        let mut s = seeded();
        let text = run_script(&mut s, "compress\nls\n");
        assert!(text.contains("2 compressed, 0 already done, 0 failed"));
        assert!(text.contains("  1. a.sql"));
        assert!(text.contains("done"));
    }

    #[test]
    fn remove_by_number() {
        let mut s = seeded();
        let text = run_script(&mut s, "rm 1\n");
        assert!(text.contains("removed a.sql"));
        assert_eq!(s.files().len(), 1);
        assert_eq!(s.files()[0].name(), "b.sql");
    }

    #[test]
    fn save_before_compress_is_reported() {
        let mut s = seeded();
        let dir = tempfile::tempdir().unwrap();
        let script = format!("save {} a.sql\n", dir.path().display());
        let text = run_script(&mut s, &script);
        assert!(text.contains("error: no compressed output for a.sql"));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn save_and_bundle_write_files() {
        let mut s = seeded();
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path().display();
        run_script(&mut s, &format!("compress\nsave {d} 2\nbundle {d}\n"));
        assert!(dir.path().join("compressed_b.sql.gz").is_file());
        assert!(dir.path().join("sql_compressed.zip").is_file());
    }

    #[test]
    fn preview_selects_the_file() {
        let mut s = seeded();
        let text = run_script(&mut s, "preview a.sql\n");
        assert!(text.contains("SELECT 1; -- one"));
        assert!(text.contains("--- minified"));
        assert_eq!(s.selected().unwrap().name(), "a.sql");
    }

    #[test]
    fn quoted_paths_keep_their_spaces() {
        assert_eq!(
            words(r#"plain "with space/x.sql"  b"#).unwrap(),
            vec!["plain", "with space/x.sql", "b"]
        );
        assert!(words(r#""open"#).is_err());

        let mut s = seeded();
        let dir = tempfile::tempdir().unwrap();
        let spaced = dir.path().join("my scripts");
        std::fs::create_dir(&spaced).unwrap();
        std::fs::write(spaced.join("c.sql"), "SELECT 3;").unwrap();
        let d = spaced.display();
        let text = run_script(
            &mut s,
            &format!("add \"{d}/c.sql\"\ncompress\nsave \"{d}\" c.sql\nbundle \"{d}\"\n"),
        );
        assert!(text.contains("added 1 file(s)"), "{text}");
        assert!(spaced.join("compressed_c.sql.gz").is_file());
        assert!(spaced.join("sql_compressed.zip").is_file());
    }

    #[test]
    fn names_with_spaces_resolve_quoted_or_not() {
        let mut s = seeded();
        s.intake(vec![Blob::from_bytes("a.sql", b"SELECT 9;".to_vec())])
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path().display();
        let text = run_script(
            &mut s,
            &format!("compress\nsave {d} a (1).sql\nrm \"a (1).sql\"\n"),
        );
        assert!(dir.path().join("compressed_a (1).sql.gz").is_file());
        assert!(text.contains("removed a (1).sql"), "{text}");
        assert!(s.file("a (1).sql").is_none());
    }

    #[test]
    fn unknown_input_keeps_going() {
        let mut s = seeded();
        let text = run_script(&mut s, "frobnicate\nrm nope.sql\nstats\nquit\nls\n");
        assert!(text.contains("unknown command `frobnicate`"));
        assert!(text.contains("error: unknown file: nope.sql"));
        assert!(text.contains("2 file(s), 0 compressed"));
        assert!(!text.contains("a.sql"));
    }
}
