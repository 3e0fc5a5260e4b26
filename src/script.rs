//! Command scripts for the registry
//!
//! A script is a sequence of lines, one command per line. Blank lines and
//! anything after `#` are ignored. Queries print one line of output each.
//!
//! ```text
//! insert PREV NEXT BEGIN END   # hint-positioned insert
//! add BEGIN END                # insert at the sorted position
//! remove ID BEGIN END
//! get ID | next ID | prev ID
//! first | max | last | list | stats | check
//! ```

use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::path::Path;

use log::info;
use smallvec::SmallVec;

use crate::error::Error;
use crate::interval::{IntervalRegistry, NodeId};
use crate::storage::NodeStore;

/// Errors raised while parsing or running a script
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// A line could not be parsed
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What was wrong with the line
        message: String,
    },
    /// The registry rejected a command
    #[error("line {line}: {source}")]
    Registry {
        /// 1-based line number
        line: usize,
        /// Registry error
        #[source]
        source: Error,
    },
    /// Reading the script failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One parsed script command
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Insert { prev: NodeId, next: NodeId, begin: u64, end: u64 },
    Add { begin: u64, end: u64 },
    Remove { id: NodeId, begin: u64, end: u64 },
    Get(NodeId),
    Next(NodeId),
    Prev(NodeId),
    First,
    Max,
    Last,
    List,
    Stats,
    Check,
}

impl Command {
    /// Parse a single line, `Ok(None)` for blank and comment lines
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let line = line.split('#').next().unwrap_or_default().trim();
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };

        let mut args: SmallVec<[u64; 4]> = SmallVec::new();
        for word in words {
            let value = word
                .parse::<u64>()
                .map_err(|_| format!("invalid number '{}'", word))?;
            args.push(value);
        }

        let expect = |count: usize| {
            if args.len() == count {
                Ok(())
            } else {
                Err(format!("'{}' takes {} arguments, got {}", name, count, args.len()))
            }
        };

        let command = match name {
            "insert" => {
                expect(4)?;
                Command::Insert {
                    prev: NodeId::new(args[0]),
                    next: NodeId::new(args[1]),
                    begin: args[2],
                    end: args[3],
                }
            }
            "add" => {
                expect(2)?;
                Command::Add { begin: args[0], end: args[1] }
            }
            "remove" => {
                expect(3)?;
                Command::Remove {
                    id: NodeId::new(args[0]),
                    begin: args[1],
                    end: args[2],
                }
            }
            "get" => {
                expect(1)?;
                Command::Get(NodeId::new(args[0]))
            }
            "next" => {
                expect(1)?;
                Command::Next(NodeId::new(args[0]))
            }
            "prev" => {
                expect(1)?;
                Command::Prev(NodeId::new(args[0]))
            }
            "first" => {
                expect(0)?;
                Command::First
            }
            "max" => {
                expect(0)?;
                Command::Max
            }
            "last" => {
                expect(0)?;
                Command::Last
            }
            "list" => {
                expect(0)?;
                Command::List
            }
            "stats" => {
                expect(0)?;
                Command::Stats
            }
            "check" => {
                expect(0)?;
                Command::Check
            }
            other => return Err(format!("unknown command '{}'", other)),
        };

        Ok(Some(command))
    }

    /// Apply the command, appending any output lines to `out`
    pub fn apply<S: NodeStore>(
        self,
        registry: &mut IntervalRegistry<S>,
        out: &mut Vec<String>,
    ) -> Result<(), Error> {
        match self {
            Command::Insert { prev, next, begin, end } => {
                let id = registry.insert(prev, next, begin, end)?;
                out.push(format!("inserted {}", id));
            }
            Command::Add { begin, end } => {
                let id = registry.insert_sorted(begin, end)?;
                out.push(format!("inserted {}", id));
            }
            Command::Remove { id, begin, end } => match registry.remove(id, begin, end)? {
                Some(fragment) => out.push(format!("removed, split off {}", fragment)),
                None => out.push("removed".to_string()),
            },
            Command::Get(id) => {
                let (begin, end) = registry.get(id)?;
                out.push(format!("{} [{},{})", id, begin, end));
            }
            Command::Next(id) => out.push(registry.next(id)?.to_string()),
            Command::Prev(id) => out.push(registry.prev(id)?.to_string()),
            Command::First => out.push(registry.first_index().to_string()),
            Command::Max => out.push(registry.max_index().to_string()),
            Command::Last => out.push(registry.last_inserted().to_string()),
            Command::List => {
                let mut line = String::new();
                for node in registry.iter() {
                    if !line.is_empty() {
                        line.push(' ');
                    }
                    let _ = write!(line, "{}:{}", node.id, node.interval());
                }
                out.push(line);
            }
            Command::Stats => {
                let stats = registry.stats();
                out.push(format!(
                    "intervals={} max_index={} covered={}",
                    stats.interval_count, stats.max_index, stats.covered
                ));
            }
            Command::Check => {
                registry.validate()?;
                out.push("ok".to_string());
            }
        }
        Ok(())
    }
}

/// Run every line from `reader`, stopping at the first failing line.
///
/// Output is written to `out` as each command completes, so lines printed
/// before a failure are kept. Returns the number of commands executed.
pub fn run<S: NodeStore, R: BufRead, W: Write>(
    registry: &mut IntervalRegistry<S>,
    reader: R,
    out: &mut W,
) -> Result<usize, ScriptError> {
    let mut lines = Vec::new();
    let mut executed = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let command = Command::parse(&line)
            .map_err(|message| ScriptError::Parse { line: number, message })?;
        if let Some(command) = command {
            let applied = command.apply(registry, &mut lines);
            for line in lines.drain(..) {
                writeln!(out, "{}", line)?;
            }
            out.flush()?;
            applied.map_err(|source| ScriptError::Registry { line: number, source })?;
            executed += 1;
        }
    }

    info!("executed {} commands, {} intervals live", executed, registry.len());
    Ok(executed)
}

/// Run a script stored in a file
pub fn run_file<S: NodeStore, W: Write>(
    registry: &mut IntervalRegistry<S>,
    path: impl AsRef<Path>,
    out: &mut W,
) -> Result<usize, ScriptError> {
    let file = std::fs::File::open(path)?;
    run(registry, std::io::BufReader::new(file), out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InsertError, RemoveError};
    use tempfile::NamedTempFile;

    /// Run `script`, returning the outcome and every line written
    fn run_collect<S: NodeStore>(
        registry: &mut IntervalRegistry<S>,
        script: &str,
    ) -> (Result<usize, ScriptError>, Vec<String>) {
        let mut out = Vec::new();
        let result = run(registry, script.as_bytes(), &mut out);
        let text = String::from_utf8(out).unwrap();
        (result, text.lines().map(str::to_string).collect())
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("insert 1 0 100 200"),
            Ok(Some(Command::Insert {
                prev: NodeId::new(1),
                next: NodeId::NIL,
                begin: 100,
                end: 200
            }))
        );
        assert_eq!(
            Command::parse("  remove 3 5 6   # trailing comment"),
            Ok(Some(Command::Remove {
                id: NodeId::new(3),
                begin: 5,
                end: 6
            }))
        );
        assert_eq!(Command::parse("list"), Ok(Some(Command::List)));
        assert_eq!(Command::parse(""), Ok(None));
        assert_eq!(Command::parse("# only a comment"), Ok(None));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("insert 1 0 100").is_err());
        assert!(Command::parse("get -1").is_err());
        assert!(Command::parse("first 1").is_err());
        assert!(Command::parse("frobnicate").is_err());
    }

    #[test]
    fn test_run_script() {
        let script = "\
            insert 0 0 0 100\n\
            insert 1 0 101 200\n\
            insert 1 2 100 101   # closes the gap\n\
            get 1\n\
            remove 1 50 70\n\
            max\n\
            last\n\
            list\n\
            stats\n\
            check\n";
        let mut registry = IntervalRegistry::new();

        let (result, out) = run_collect(&mut registry, script);

        assert_eq!(result.unwrap(), 10);
        assert_eq!(
            out,
            vec![
                "inserted 1",
                "inserted 2",
                "inserted 1",
                "1 [0,200)",
                "removed, split off 4",
                "4",
                "4",
                "1:[0,50) 4:[70,200)",
                "intervals=2 max_index=4 covered=180",
                "ok",
            ]
        );
    }

    #[test]
    fn test_run_stops_at_failing_line() {
        let script = "add 0 100\nadd 50 60\nadd 200 300\n";
        let mut registry = IntervalRegistry::new();

        let (result, out) = run_collect(&mut registry, script);

        assert_eq!(out, vec!["inserted 1"]);
        match result.unwrap_err() {
            ScriptError::Registry { line, source } => {
                assert_eq!(line, 2);
                assert!(matches!(
                    source,
                    Error::InvalidInsert(InsertError::OverlapsPrev { .. })
                ));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_run_reports_parse_line() {
        let mut registry = IntervalRegistry::new();
        let (result, out) = run_collect(&mut registry, "first\n\nbogus 1\n");
        assert!(matches!(result, Err(ScriptError::Parse { line: 3, .. })));
        assert_eq!(out, vec!["0"]);
    }

    #[test]
    fn test_output_before_failure_is_kept() {
        let mut registry = IntervalRegistry::new();
        let (result, out) = run_collect(&mut registry, "add 0 10\nget 1\nlist\nget 9\nmax\n");

        assert!(matches!(
            result,
            Err(ScriptError::Registry {
                line: 4,
                source: Error::NotFound(_)
            })
        ));
        assert_eq!(out, vec!["inserted 1", "1 [0,10)", "1:[0,10)"]);
    }

    #[test]
    fn test_run_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temporary file");
        writeln!(file, "add 10 20").unwrap();
        writeln!(file, "remove 1 10 20").unwrap();
        writeln!(file, "remove 1 10 20").unwrap();

        let mut registry = IntervalRegistry::new();
        let mut out = Vec::new();
        let err = run_file(&mut registry, file.path(), &mut out).unwrap_err();

        assert!(matches!(
            err,
            ScriptError::Registry {
                line: 3,
                source: Error::InvalidRemove(RemoveError::DeadNode(_))
            }
        ));
        assert!(registry.is_empty());
        assert_eq!(String::from_utf8(out).unwrap(), "inserted 1\nremoved\n");
    }

    #[test]
    fn test_run_file_missing() {
        let dir = tempfile::tempdir().expect("Failed to create temporary directory");
        let mut registry = IntervalRegistry::new();
        let err = run_file(&mut registry, dir.path().join("missing.txt"), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, ScriptError::Io(_)));
    }
}
