//! The stack-based composite object parser (§4.5): consumes tokens from a
//! [`Tokenizer`] and assembles arrays, dictionaries, and procedures.

use std::collections::VecDeque;
use std::io::{Read, Seek};

use tracing::trace;

use crate::error::{ParserError, Result};
use crate::intern::{Operator, STRUCTURAL};
use crate::object::{chop, literal_name, Object};
use crate::token::{Token, Tokenizer};

/// The kind of container a context-stack entry is building.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ContainerKind {
    Array,
    Dict,
    Proc,
}

/// Policy knobs threaded explicitly through the parser's constructor in
/// place of the source's process-wide `settings.STRICT` global (§5, §9,
/// §11): strictness and the dictionary null marker are both per-instance.
#[derive(Clone)]
pub struct ParserConfig {
    /// When true, array/proc close mismatches and non-Name dictionary keys
    /// become fatal `TypeError`s instead of being swallowed.
    pub strict: bool,
    /// Values for which this predicate returns true are dropped when
    /// building a `Dict`, matching the source's `if v is not None` filter
    /// generalized to whatever "null" means to the caller's object model.
    pub is_null: fn(&Object) -> bool,
}

fn never_null(_: &Object) -> bool {
    false
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { strict: false, is_null: never_null }
    }
}

/// A suspended enclosing builder, recorded at the moment a nested container
/// is opened. `start_pos` is that nested container's own opening position —
/// stashed here so it survives to be read back out when the nested
/// container closes — while `kind`/`stack` are the enclosing builder's
/// state to resume (`kind: None` for the top level, which has no builder).
struct Context {
    start_pos: u64,
    kind: Option<ContainerKind>,
    stack: Vec<(u64, Object)>,
}

/// Consumes a [`Tokenizer`]'s token stream and emits complete top-level
/// `(position, Object)` pairs.
pub struct StackParser<S> {
    tokenizer: Tokenizer<S>,
    config: ParserConfig,
    context: Vec<Context>,
    current_kind: Option<ContainerKind>,
    current_stack: Vec<(u64, Object)>,
    results: VecDeque<(u64, Object)>,
}

impl<S: Read + Seek> StackParser<S> {
    /// Wrap a stream with the default (lenient) configuration.
    pub fn new(stream: S) -> Result<Self> {
        Self::with_config(stream, ParserConfig::default())
    }

    /// Wrap a stream with an explicit [`ParserConfig`].
    pub fn with_config(stream: S, config: ParserConfig) -> Result<Self> {
        Ok(Self {
            tokenizer: Tokenizer::new(stream)?,
            config,
            context: Vec::new(),
            current_kind: None,
            current_stack: Vec::new(),
            results: VecDeque::new(),
        })
    }

    /// Absolute offset of the read cursor.
    pub fn tell(&self) -> u64 {
        self.tokenizer.tell()
    }

    /// Jump to `pos`, fully resetting both the tokenizer and the stack
    /// parser's own state (context stack, pending results).
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.tokenizer.seek(pos)?;
        self.context.clear();
        self.current_kind = None;
        self.current_stack.clear();
        self.results.clear();
        Ok(())
    }

    fn push(&mut self, pos: u64, obj: Object) {
        self.current_stack.push((pos, obj));
    }

    fn start_container(&mut self, pos: u64, kind: ContainerKind) {
        trace!(pos, ?kind, "parser: start container");
        let enclosing_kind = self.current_kind.take();
        let enclosing_stack = std::mem::take(&mut self.current_stack);
        self.context.push(Context {
            start_pos: pos,
            kind: enclosing_kind,
            stack: enclosing_stack,
        });
        self.current_kind = Some(kind);
    }

    /// Close the innermost container, returning its own opening position
    /// (read back from the `Context` pushed when it was started) and its
    /// collected items, or a `TypeError` if `kind` does not match what is
    /// actually open.
    fn end_container(&mut self, kind: ContainerKind, pos: u64) -> Result<(u64, Vec<Object>)> {
        if self.current_kind != Some(kind) {
            return Err(ParserError::TypeError {
                position: pos,
                message: format!(
                    "type mismatch: {:?} != {:?}",
                    self.current_kind, kind
                ),
            });
        }
        let items: Vec<Object> = self.current_stack.drain(..).map(|(_, obj)| obj).collect();
        let ctx = self.context.pop().expect("container open implies a pushed context");
        self.current_kind = ctx.kind;
        self.current_stack = ctx.stack;
        Ok((ctx.start_pos, items))
    }

    /// Hook invoked for every non-structural operator, with the innermost
    /// builder's state visible. The default implementation is a no-op;
    /// subclasses layering higher PDF semantics (e.g. `obj`/`endobj`,
    /// indirect references) override this to react.
    fn handle_operator(&mut self, _pos: u64, _op: &Operator) {}

    /// Hook invoked whenever the context stack empties out after a token,
    /// i.e. a top-level boundary has just been crossed. Default is a no-op.
    fn flush(&mut self) {}

    fn close_array_or_proc(&mut self, kind: ContainerKind, pos: u64, wrap: fn(Vec<Object>) -> Object) -> Result<()> {
        match self.end_container(kind, pos) {
            Ok((start, items)) => {
                self.push(start, wrap(items));
                Ok(())
            }
            Err(e @ ParserError::TypeError { .. }) => {
                if self.config.strict {
                    Err(e)
                } else {
                    trace!(pos, "parser: suppressed close mismatch in lenient mode");
                    Ok(())
                }
            }
            Err(e) => Err(e),
        }
    }

    fn close_dict(&mut self, pos: u64) -> Result<()> {
        match self.end_container(ContainerKind::Dict, pos) {
            Ok((start, items)) => {
                if items.len() % 2 != 0 {
                    return Err(ParserError::SyntaxError {
                        position: start,
                        message: format!("invalid dictionary construct: {} items", items.len()),
                    });
                }
                let mut entries = Vec::with_capacity(items.len() / 2);
                for pair in chop(2, &items) {
                    let [key, value] = <[Object; 2]>::try_from(pair).unwrap();
                    if (self.config.is_null)(&value) {
                        continue;
                    }
                    let key_text = literal_name(&key, self.config.strict, start)?;
                    entries.push((key_text, value));
                }
                self.push(start, Object::Dict(entries));
                Ok(())
            }
            Err(e @ ParserError::TypeError { .. }) => {
                if self.config.strict {
                    Err(e)
                } else {
                    trace!(pos, "parser: suppressed close mismatch in lenient mode");
                    Ok(())
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Pull tokens and assemble containers until at least one complete
    /// top-level object is ready, then return it.
    pub fn next_object(&mut self) -> Result<(u64, Object)> {
        while self.results.is_empty() {
            let (pos, token) = self.tokenizer.next_token()?;
            if let Token::Operator(op) = &token {
                let op = op.clone();
                if op == STRUCTURAL.array_begin {
                    self.start_container(pos, ContainerKind::Array);
                } else if op == STRUCTURAL.array_end {
                    self.close_array_or_proc(ContainerKind::Array, pos, Object::List)?;
                } else if op == STRUCTURAL.dict_begin {
                    self.start_container(pos, ContainerKind::Dict);
                } else if op == STRUCTURAL.dict_end {
                    self.close_dict(pos)?;
                } else if op == STRUCTURAL.proc_begin {
                    self.start_container(pos, ContainerKind::Proc);
                } else if op == STRUCTURAL.proc_end {
                    self.close_array_or_proc(ContainerKind::Proc, pos, Object::Proc)?;
                } else {
                    self.handle_operator(pos, &op);
                }
            } else {
                let obj = Object::from(token);
                self.push(pos, obj);
            }
            if !self.context.is_empty() {
                continue;
            }
            if self.current_kind.is_none() && !self.current_stack.is_empty() {
                // A top-level value just landed with no open container:
                // drain it straight into results.
                self.results.extend(self.current_stack.drain(..));
            }
            self.flush();
        }
        Ok(self.results.pop_front().unwrap())
    }
}
