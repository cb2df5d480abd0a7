use elfcommon::prelude::*;

use std::collections::BTreeSet;
use std::path::Path;

use elfcommon::system::{Executor, Task};
use elfread::Object;
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::config::Check;
use crate::error::Error;

/// Start loading the symbol lists and compile the disallowed patterns
pub fn load(root: &Path, config: Check, executor: &Executor) -> Result<Checker, Error> {
    let mut tasks = Vec::with_capacity(config.symbols.len());
    for path in &config.symbols {
        let id = path.clone();
        let path = root.join(path);
        let task_id = id.clone();
        let task = executor.execute(move || -> Result<Vec<String>, Error> {
            verboseln!("loading '{}'", task_id);
            let symbols = system::read_list(&path)
                .change_context_lazy(|| Error::LoadSymbols(task_id.clone()))?;
            verboseln!("loaded {} symbols from '{}'", symbols.len(), task_id);
            Ok(symbols)
        });
        tasks.push((id, task));
    }

    let mut disallowed = Vec::with_capacity(config.disallowed_symbols.len());
    for pattern in &config.disallowed_symbols {
        let regex = Regex::new(pattern)
            .change_context_lazy(|| Error::ParseSymbolRegex(pattern.clone()))?;
        disallowed.push(regex);
    }

    Ok(Checker {
        require: config.require,
        ignore: config.ignore.into_iter().collect(),
        disallowed,
        tasks,
    })
}

pub struct Checker {
    require: Vec<String>,
    ignore: BTreeSet<String>,
    disallowed: Vec<Regex>,
    tasks: Vec<(String, Task<Result<Vec<String>, Error>>)>,
}

impl Checker {
    /// Wait for the symbol lists and check the objects against the rules
    pub fn check(self, objects: &[Object]) -> Result<CheckReport, Error> {
        let mut provided = BTreeSet::new();
        for (id, task) in self.tasks {
            provided.extend(task.wait().change_context(Error::LoadSymbols(id))??);
        }

        // symbol -> files defining it
        let mut definitions: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
        for object in objects {
            for symbol in object.defined_symbols() {
                definitions.entry(symbol).or_default().push(&object.name);
            }
        }

        let mut report = CheckReport::default();
        for symbol in &self.require {
            if !definitions.contains_key(symbol.as_str()) {
                report.missing.push(symbol.clone());
            }
        }

        for object in objects {
            for symbol in object.undefined_symbols() {
                if self.ignore.contains(symbol)
                    || provided.contains(symbol)
                    || definitions.contains_key(symbol)
                {
                    continue;
                }
                report
                    .unresolved
                    .push(SymbolRef::new(symbol, &object.name));
            }
        }

        for (symbol, files) in &definitions {
            if !self.disallowed.iter().any(|r| r.is_match(symbol)) {
                continue;
            }
            for file in files {
                report.disallowed.push(SymbolRef::new(symbol, file));
            }
        }

        report.sort();
        Ok(report)
    }
}

/// A symbol and the file it was found in
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SymbolRef {
    pub symbol: String,
    pub file: String,
}

impl SymbolRef {
    fn new(symbol: &str, file: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            file: file.to_string(),
        }
    }
}

/// Problems found by the checker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckReport {
    /// Required symbols that no file defines
    pub missing: Vec<String>,
    /// Undefined symbols that nothing resolves
    pub unresolved: Vec<SymbolRef>,
    /// Defined symbols matching a disallowed pattern
    pub disallowed: Vec<SymbolRef>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty() && self.unresolved.is_empty() && self.disallowed.is_empty()
    }

    pub fn problem_count(&self) -> usize {
        self.missing.len() + self.unresolved.len() + self.disallowed.len()
    }

    fn sort(&mut self) {
        self.missing.sort();
        self.missing.dedup();
        self.unresolved.sort();
        self.disallowed.sort();
    }

    /// Print every problem as an error line
    pub fn print(&self) {
        for symbol in &self.missing {
            errorln!("Missing", "required symbol `{}` is not defined", symbol);
        }
        for r in &self.unresolved {
            errorln!("Unresolved", "`{}` referenced in '{}'", r.symbol, r.file);
        }
        for r in &self.disallowed {
            errorln!("Disallowed", "`{}` defined in '{}'", r.symbol, r.file);
        }
    }
}
