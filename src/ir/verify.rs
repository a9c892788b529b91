use super::*;

use std::collections::{HashMap, HashSet};

/// One malformed value can trip several checks; report each message once.
fn dedupe(errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    errors.retain(|e| seen.insert(e.clone()));
}

/// Structural checks over a finished function: every block terminated,
/// single assignment per register, every use covered by a definition on
/// all paths from entry, and branch/phi edges naming real blocks.
pub fn verify_function(function: &Function) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    let fname = &function.name;

    if function.blocks.is_empty() {
        return Err(vec![format!("function '{}' has no blocks", fname)]);
    }

    let mut labels: HashMap<&str, usize> = HashMap::new();
    for (i, block) in function.blocks.iter().enumerate() {
        if labels.insert(block.label.as_str(), i).is_some() {
            errors.push(format!(
                "function '{}': duplicate block label '{}'",
                fname, block.label
            ));
        }
    }

    // terminators and their targets
    for block in &function.blocks {
        match &block.terminator {
            None => errors.push(format!(
                "function '{}': block '{}' has no terminator",
                fname, block.label
            )),
            Some(Terminator::Br { label, .. }) => {
                if !labels.contains_key(label.as_str()) {
                    errors.push(format!(
                        "function '{}': branch to unknown block '{}'",
                        fname, label
                    ));
                }
            }
            Some(Terminator::CondBr {
                then_label,
                else_label,
                ..
            }) => {
                for label in [then_label, else_label] {
                    if !labels.contains_key(label.as_str()) {
                        errors.push(format!(
                            "function '{}': branch to unknown block '{}'",
                            fname, label
                        ));
                    }
                }
            }
            Some(Terminator::Ret { value, .. }) => {
                match (value, function.return_type == IRType::Void) {
                    (Some(_), true) => errors.push(format!(
                        "function '{}': returns a value but is declared void",
                        fname
                    )),
                    (None, false) => errors.push(format!(
                        "function '{}': ret without a value in a non-void function",
                        fname
                    )),
                    _ => {}
                }
            }
            Some(Terminator::Unreachable { .. }) => {}
        }
    }

    // single assignment
    let params: HashSet<&str> = function.params.iter().map(|(n, _)| n.as_str()).collect();
    let mut all_defs: HashSet<&str> = HashSet::new();
    for block in &function.blocks {
        for instr in &block.instructions {
            if let Some(dest) = instr.dest() {
                if !all_defs.insert(dest) {
                    errors.push(format!(
                        "function '{}': register {} defined more than once",
                        fname, dest
                    ));
                }
            }
        }
    }

    if !errors.is_empty() {
        // dataflow over a malformed CFG would only produce noise
        dedupe(&mut errors);
        return Err(errors);
    }

    // definitely-defined-at-entry sets: entry starts empty, everything else
    // starts at top and gets the intersection of its predecessors' exits.
    let n = function.blocks.len();
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, block) in function.blocks.iter().enumerate() {
        match &block.terminator {
            Some(Terminator::Br { label, .. }) => preds[labels[label.as_str()]].push(i),
            Some(Terminator::CondBr {
                then_label,
                else_label,
                ..
            }) => {
                preds[labels[then_label.as_str()]].push(i);
                preds[labels[else_label.as_str()]].push(i);
            }
            _ => {}
        }
    }

    let block_defs: Vec<HashSet<&str>> = function
        .blocks
        .iter()
        .map(|b| {
            b.instructions
                .iter()
                .filter_map(|i| i.dest())
                .collect::<HashSet<&str>>()
        })
        .collect();

    let top: HashSet<&str> = all_defs.clone();
    let mut defs_in: Vec<HashSet<&str>> = vec![top.clone(); n];
    defs_in[0] = HashSet::new();

    let mut changed = true;
    while changed {
        changed = false;
        for i in 0..n {
            let new_in = if i == 0 {
                HashSet::new()
            } else if preds[i].is_empty() {
                top.clone()
            } else {
                let mut it = preds[i].iter();
                let first = *it.next().expect("non-empty");
                let mut acc: HashSet<&str> =
                    defs_in[first].union(&block_defs[first]).copied().collect();
                for &p in it {
                    let out: HashSet<&str> =
                        defs_in[p].union(&block_defs[p]).copied().collect();
                    acc = acc.intersection(&out).copied().collect();
                }
                acc
            };
            if new_in != defs_in[i] {
                defs_in[i] = new_in;
                changed = true;
            }
        }
    }

    let defs_out: Vec<HashSet<&str>> = (0..n)
        .map(|i| defs_in[i].union(&block_defs[i]).copied().collect())
        .collect();

    let check_value = |value: &Value, running: &HashSet<&str>, where_: &str| -> Option<String> {
        match value {
            Value::Register(name) => {
                if !running.contains(name.as_str()) {
                    return Some(format!(
                        "function '{}': use of undefined value {} in {}",
                        fname, name, where_
                    ));
                }
            }
            Value::Argument(name) => {
                if !params.contains(name.as_str()) {
                    return Some(format!(
                        "function '{}': unknown argument %{} in {}",
                        fname, name, where_
                    ));
                }
            }
            Value::Constant(_) | Value::Global(_) => {}
        }
        None
    };

    for (i, block) in function.blocks.iter().enumerate() {
        let mut running = defs_in[i].clone();
        for instr in &block.instructions {
            if let Instruction::Phi { incoming, .. } = instr {
                if incoming.is_empty() {
                    errors.push(format!(
                        "function '{}': phi with no incoming edges in block '{}'",
                        fname, block.label
                    ));
                }
                for (value, label) in incoming {
                    match labels.get(label.as_str()) {
                        None => errors.push(format!(
                            "function '{}': phi edge from unknown block '{}'",
                            fname, label
                        )),
                        Some(&from) => {
                            if let Some(err) = check_value(
                                value,
                                &defs_out[from],
                                &format!("phi edge from '{}'", label),
                            ) {
                                errors.push(err);
                            }
                        }
                    }
                }
            } else {
                for value in instr.operands() {
                    if let Some(err) =
                        check_value(value, &running, &format!("block '{}'", block.label))
                    {
                        errors.push(err);
                    }
                }
            }
            if let Some(dest) = instr.dest() {
                running.insert(dest);
            }
        }
        let term_operand = match &block.terminator {
            Some(Terminator::CondBr { cond, .. }) => Some(cond),
            Some(Terminator::Ret { value: Some(v), .. }) => Some(v),
            _ => None,
        };
        if let Some(value) = term_operand {
            if let Some(err) = check_value(value, &running, &format!("block '{}'", block.label)) {
                errors.push(err);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        dedupe(&mut errors);
        Err(errors)
    }
}

/// Whole-module pass: per-function checks plus cross-references (call
/// targets and globals must resolve).
pub fn verify_module(module: &Module) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let function_names: HashSet<&str> = module.functions.iter().map(|f| f.name.as_str()).collect();
    let global_names: HashSet<&str> = module
        .globals
        .iter()
        .map(|g| g.name.as_str())
        .chain(module.global_strings.keys().map(|k| k.as_str()))
        .collect();

    for function in &module.functions {
        if function.is_external {
            continue;
        }
        if let Err(mut errs) = verify_function(function) {
            errors.append(&mut errs);
        }
        for block in &function.blocks {
            for instr in &block.instructions {
                if let Instruction::Call { func, .. } = instr {
                    if !function_names.contains(func.as_str()) {
                        errors.push(format!(
                            "function '{}': call to unknown function '{}'",
                            function.name, func
                        ));
                    }
                }
                for value in instr.operands() {
                    if let Value::Global(name) = value {
                        if !global_names.contains(name.as_str()) {
                            errors.push(format!(
                                "function '{}': reference to unknown global @{}",
                                function.name, name
                            ));
                        }
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        dedupe(&mut errors);
        Err(errors)
    }
}
