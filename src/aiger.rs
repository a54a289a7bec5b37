// SPDX-License-Identifier: Apache-2.0

//! Loads combinational AIGER files into a `SubjectGraph`.
//!
//! Both the ASCII (`aag`) and the binary (`aig`) flavors are read; latches are
//! rejected. The parser is strict: any literal that refers to a variable not
//! yet defined is an error, so AND lines must come in topological order.
//!
//! Constant fanins are folded while building. With
//! `AigerOptions::recognize_xor_mux` the three-AND pattern
//! `AND(!AND(s, x), !AND(!s, y))` is rebuilt as one negated MUX node, or as an
//! XOR node when `x == !y`, provided both inner ANDs feed nothing else.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::graph::{NodeKind, Operand, SubjectGraph};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AigerOptions {
    pub recognize_xor_mux: bool,
}

#[derive(Debug)]
pub struct LoadAigerResult {
    pub graph: SubjectGraph,
    /// AIGER variable index to the operand that now computes it. Inner ANDs
    /// absorbed into a MUX or XOR have no entry.
    pub var_to_operand: HashMap<u32, Operand>,
    pub recognized_muxes: usize,
    pub recognized_xors: usize,
}

#[derive(Debug, Clone, Copy)]
struct AndLine {
    lhs_var: u32,
    rhs0_lit: u32,
    rhs1_lit: u32,
}

/// Everything read from the file, before any graph is built.
#[derive(Debug, Default)]
struct AigerFile {
    max_var: u32,
    input_vars: Vec<u32>,
    output_lits: Vec<u32>,
    ands: Vec<AndLine>,
    input_names: HashMap<usize, String>,
    output_names: HashMap<usize, String>,
}

/// Parses the provided ASCII-AIGER text.
pub fn load_aiger(src: &str, opts: AigerOptions) -> Result<LoadAigerResult, String> {
    let file = parse_ascii(src)?;
    build_graph(&file, opts)
}

/// Parses ASCII or binary AIGER bytes, dispatching on the header.
pub fn load_aiger_bytes(src: &[u8], opts: AigerOptions) -> Result<LoadAigerResult, String> {
    let (header, _) = read_ascii_line(src, 0)?;
    match header.split_whitespace().next() {
        Some("aag") => {
            let text = std::str::from_utf8(src)
                .map_err(|e| format!("invalid UTF-8 in ASCII AIGER input: {}", e))?;
            load_aiger(text, opts)
        }
        Some("aig") => build_graph(&parse_binary(src)?, opts),
        Some(other) => Err(format!("unknown AIGER header '{}'", other)),
        None => Err("missing AIGER header token".to_string()),
    }
}

pub fn load_aiger_file(path: &Path, opts: AigerOptions) -> Result<LoadAigerResult, String> {
    let contents =
        fs::read(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    load_aiger_bytes(&contents, opts)
}

/// Reads `<kind> M I L O A` and returns `(M, I, O, A)`.
fn parse_header(line: &str, kind: &str) -> Result<(u32, u32, u32, u32), String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 6 {
        return Err(format!(
            "expected 6 tokens in AIGER header, got {} (\"{}\")",
            tokens.len(),
            line
        ));
    }
    if tokens[0] != kind {
        return Err(format!("expected '{}' header; got '{}'", kind, tokens[0]));
    }
    let parse_u32 = |s: &str, field: &str| -> Result<u32, String> {
        s.parse::<u32>()
            .map_err(|e| format!("invalid {} value '{}': {}", field, s, e))
    };
    let m = parse_u32(tokens[1], "M")?;
    let i = parse_u32(tokens[2], "I")?;
    let l = parse_u32(tokens[3], "L")?;
    let o = parse_u32(tokens[4], "O")?;
    let a = parse_u32(tokens[5], "A")?;
    if l != 0 {
        return Err("latch count (L) must be zero; sequential AIGER is not supported".to_string());
    }
    Ok((m, i, o, a))
}

fn parse_literal(line: &str, what: &str) -> Result<u32, String> {
    line.trim()
        .parse()
        .map_err(|e| format!("invalid {} literal '{}': {}", what, line, e))
}

fn next_non_empty_line<'a>(iter: &mut std::str::Lines<'a>) -> Option<&'a str> {
    iter.find(|line| !line.trim().is_empty())
}

fn parse_ascii(src: &str) -> Result<AigerFile, String> {
    let mut lines = src.lines();
    let header = lines
        .next()
        .ok_or_else(|| "empty AIGER input".to_string())?;
    let (max_var, i, o, a) = parse_header(header, "aag")?;
    let mut file = AigerFile {
        max_var,
        ..Default::default()
    };

    for _ in 0..i {
        let line = next_non_empty_line(&mut lines)
            .ok_or_else(|| format!("expected {} input lines but found fewer", i))?;
        let lit = parse_literal(line, "input")?;
        if lit & 1 != 0 {
            return Err(format!(
                "input literal must be positive, got negated literal {}",
                lit
            ));
        }
        if lit >> 1 == 0 {
            return Err("input literal refers to constant false (0)".to_string());
        }
        file.input_vars.push(lit >> 1);
    }
    for _ in 0..o {
        let line = next_non_empty_line(&mut lines)
            .ok_or_else(|| format!("expected {} output lines but found fewer", o))?;
        file.output_lits.push(parse_literal(line, "output")?);
    }
    for _ in 0..a {
        let line = next_non_empty_line(&mut lines)
            .ok_or_else(|| format!("expected {} AND lines but found fewer", a))?;
        let toks: Vec<&str> = line.split_whitespace().collect();
        if toks.len() != 3 {
            return Err(format!("AND line should have 3 fields, got '{}'", line));
        }
        let lhs = parse_literal(toks[0], "AND lhs")?;
        if lhs & 1 != 0 {
            return Err(format!("AND lhs literal {} must be positive (even)", lhs));
        }
        file.ands.push(AndLine {
            lhs_var: lhs >> 1,
            rhs0_lit: parse_literal(toks[1], "AND rhs")?,
            rhs1_lit: parse_literal(toks[2], "AND rhs")?,
        });
    }
    parse_symbols(lines, &mut file)?;
    Ok(file)
}

fn parse_binary(src: &[u8]) -> Result<AigerFile, String> {
    let (header, mut cursor) = read_ascii_line(src, 0)?;
    let (max_var, i, o, a) = parse_header(&header, "aig")?;
    let mut file = AigerFile {
        max_var,
        input_vars: (1..=i).collect(),
        ..Default::default()
    };
    for _ in 0..o {
        let (line, next) = read_ascii_line(src, cursor)?;
        cursor = next;
        file.output_lits.push(parse_literal(&line, "output")?);
    }
    for and_idx in 0..a {
        let delta0 = decode_u32_varint(src, &mut cursor)?;
        let delta1 = decode_u32_varint(src, &mut cursor)?;
        let lhs_var = i + and_idx + 1;
        let lhs_lit = lhs_var << 1;
        let rhs0_lit = lhs_lit
            .checked_sub(delta0)
            .ok_or_else(|| format!("invalid AIGER delta0 {} for lhs {}", delta0, lhs_lit))?;
        let rhs1_lit = rhs0_lit
            .checked_sub(delta1)
            .ok_or_else(|| format!("invalid AIGER delta1 {} for rhs0 {}", delta1, rhs0_lit))?;
        file.ands.push(AndLine {
            lhs_var,
            rhs0_lit,
            rhs1_lit,
        });
    }
    let tail = std::str::from_utf8(&src[cursor.min(src.len())..])
        .map_err(|e| format!("invalid UTF-8 in symbol/comment tail: {}", e))?;
    parse_symbols(tail.lines(), &mut file)?;
    Ok(file)
}

fn read_ascii_line(src: &[u8], start: usize) -> Result<(String, usize), String> {
    if start >= src.len() {
        return Err("unexpected EOF while reading ASCII line".to_string());
    }
    let end = src[start..]
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| "unterminated ASCII line in AIGER input".to_string())?;
    let line = std::str::from_utf8(&src[start..start + end])
        .map_err(|e| format!("invalid UTF-8 in AIGER line: {}", e))?;
    Ok((line.to_string(), start + end + 1))
}

fn decode_u32_varint(src: &[u8], cursor: &mut usize) -> Result<u32, String> {
    let mut shift = 0u32;
    let mut acc = 0u32;
    loop {
        let byte = *src
            .get(*cursor)
            .ok_or_else(|| "unexpected EOF while reading AIGER varint".to_string())?;
        *cursor += 1;
        acc |= ((byte & 0x7f) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok(acc);
        }
        shift += 7;
        if shift >= 32 {
            return Err("AIGER varint overflow".to_string());
        }
    }
}

/// Reads `i<idx> <name>` and `o<idx> <name>` lines up to the comment section.
fn parse_symbols<'a>(
    lines: impl Iterator<Item = &'a str>,
    file: &mut AigerFile,
) -> Result<(), String> {
    for line in lines {
        if line.starts_with('c') {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let (kind, rest) = line.split_at(1);
        if kind != "i" && kind != "o" {
            // Latch and justice symbols carry nothing for a combinational graph.
            continue;
        }
        let (idx_str, name) = rest
            .split_once(char::is_whitespace)
            .ok_or_else(|| format!("malformed symbol '{}': missing name", line))?;
        let idx: usize = idx_str
            .parse()
            .map_err(|e| format!("invalid symbol index in '{}': {}", line, e))?;
        let (names, count) = if kind == "i" {
            (&mut file.input_names, file.input_vars.len())
        } else {
            (&mut file.output_names, file.output_lits.len())
        };
        if idx >= count {
            return Err(format!("symbol '{}' refers to a missing {}{}", line, kind, idx));
        }
        names.insert(idx, name.trim().to_string());
    }
    Ok(())
}

/// Literals `(sel, d1, d0)` such that `and` computes `!(sel ? d1 : d0)`.
fn match_mux(
    and: &AndLine,
    ands: &HashMap<u32, AndLine>,
    fanout: &[u32],
) -> Option<(u32, u32, u32)> {
    if and.rhs0_lit & 1 == 0 || and.rhs1_lit & 1 == 0 {
        return None;
    }
    let inner = |lit: u32| {
        let var = lit >> 1;
        ands.get(&var).filter(|_| fanout[var as usize] == 1)
    };
    let a0 = inner(and.rhs0_lit)?;
    let a1 = inner(and.rhs1_lit)?;
    let pairs0 = [(a0.rhs0_lit, a0.rhs1_lit), (a0.rhs1_lit, a0.rhs0_lit)];
    let pairs1 = [(a1.rhs0_lit, a1.rhs1_lit), (a1.rhs1_lit, a1.rhs0_lit)];
    for (s, x) in pairs0 {
        for (ns, y) in pairs1 {
            if ns == s ^ 1 && s > 1 {
                return Some((s, x, y));
            }
        }
    }
    None
}

fn build_graph(file: &AigerFile, opts: AigerOptions) -> Result<LoadAigerResult, String> {
    let check_var = |var: u32| -> Result<(), String> {
        if var > file.max_var {
            Err(format!(
                "variable {} exceeds the maximum index M={}",
                var, file.max_var
            ))
        } else {
            Ok(())
        }
    };

    let mut graph = SubjectGraph::new();
    let mut var_to_operand: HashMap<u32, Operand> = HashMap::new();
    var_to_operand.insert(0, Operand::FALSE);

    for (idx, &var) in file.input_vars.iter().enumerate() {
        check_var(var)?;
        if var_to_operand.contains_key(&var) {
            return Err(format!("duplicate input variable index {}", var));
        }
        let name = file
            .input_names
            .get(&idx)
            .cloned()
            .unwrap_or_else(|| format!("i{}", idx));
        var_to_operand.insert(var, graph.add_input(name));
    }

    // Inner ANDs absorbed by a recognized MUX or XOR, found top-down so that an
    // absorbed AND is never itself taken as the top of a pattern.
    let mut absorbed: Vec<bool> = vec![false; file.max_var as usize + 1];
    let mut patterns: HashMap<u32, (u32, u32, u32)> = HashMap::new();
    if opts.recognize_xor_mux {
        let mut fanout = vec![0u32; file.max_var as usize + 1];
        for al in &file.ands {
            check_var(al.lhs_var)?;
            for lit in [al.rhs0_lit, al.rhs1_lit] {
                check_var(lit >> 1)?;
                fanout[(lit >> 1) as usize] += 1;
            }
        }
        for lit in &file.output_lits {
            check_var(lit >> 1)?;
            fanout[(lit >> 1) as usize] += 1;
        }
        let by_var: HashMap<u32, AndLine> =
            file.ands.iter().map(|al| (al.lhs_var, *al)).collect();
        for al in file.ands.iter().rev() {
            if absorbed[al.lhs_var as usize] {
                continue;
            }
            if let Some(pattern) = match_mux(al, &by_var, &fanout) {
                absorbed[(al.rhs0_lit >> 1) as usize] = true;
                absorbed[(al.rhs1_lit >> 1) as usize] = true;
                patterns.insert(al.lhs_var, pattern);
            }
        }
    }

    let lit_to_operand = |lit: u32, var_map: &HashMap<u32, Operand>| -> Result<Operand, String> {
        let var = lit >> 1;
        let base = var_map
            .get(&var)
            .copied()
            .ok_or_else(|| format!("referenced undefined variable {} (literal {})", var, lit))?;
        Ok(base.negate_if(lit & 1 == 1))
    };

    let mut recognized_muxes = 0;
    let mut recognized_xors = 0;
    for al in &file.ands {
        check_var(al.lhs_var)?;
        if var_to_operand.contains_key(&al.lhs_var) {
            return Err(format!("variable {} already defined", al.lhs_var));
        }
        if absorbed[al.lhs_var as usize] {
            continue;
        }
        let op = match patterns.get(&al.lhs_var) {
            Some(&(s, x, y)) => {
                let sel = lit_to_operand(s, &var_to_operand)?;
                let d1 = lit_to_operand(x, &var_to_operand)?;
                let d0 = lit_to_operand(y, &var_to_operand)?;
                let before = graph.len();
                let op = if x == y ^ 1 {
                    graph.add_xor(sel, d1)
                } else {
                    graph.add_mux(d0, d1, sel).map(|m| m.negate())
                }
                .map_err(|e| format!("AND {}: {}", al.lhs_var, e))?;
                if graph.len() > before {
                    match graph.kind(op.node) {
                        NodeKind::Xor => recognized_xors += 1,
                        NodeKind::Mux => recognized_muxes += 1,
                        _ => {}
                    }
                }
                op
            }
            None => {
                let rhs0 = lit_to_operand(al.rhs0_lit, &var_to_operand)?;
                let rhs1 = lit_to_operand(al.rhs1_lit, &var_to_operand)?;
                graph
                    .add_and(rhs0, rhs1)
                    .map_err(|e| format!("AND {}: {}", al.lhs_var, e))?
            }
        };
        var_to_operand.insert(al.lhs_var, op);
    }

    for (idx, &lit) in file.output_lits.iter().enumerate() {
        let driver = lit_to_operand(lit, &var_to_operand)?;
        let name = file
            .output_names
            .get(&idx)
            .cloned()
            .unwrap_or_else(|| format!("o{}", idx));
        graph
            .add_output(name, driver)
            .map_err(|e| format!("output {}: {}", idx, e))?;
    }

    log::debug!(
        "loaded AIGER: {} inputs, {} outputs, {} ANDs -> {} nodes ({} MUX, {} XOR recognized)",
        file.input_vars.len(),
        file.output_lits.len(),
        file.ands.len(),
        graph.len(),
        recognized_muxes,
        recognized_xors
    );
    Ok(LoadAigerResult {
        graph,
        var_to_operand,
        recognized_muxes,
        recognized_xors,
    })
}
