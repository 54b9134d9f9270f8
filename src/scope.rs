//! Lexical scopes of named expression matrices.
//!
//! A [`ScopeStack`] holds one [`ScopeFrame`] per `#[scope]` declaration that is
//! currently visible. Frames are released in strict last-in-first-out order:
//! the driver opens a [`BlockScope`] for every block it walks and every frame
//! pushed through it is dropped when the block is done, whether the walk
//! finished or bailed out with an error.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use syn::Ident;

use crate::error::{ExpandError, Result};
use crate::matrix::ExprMatrix;

/// Names bound by a single scope declaration. Names are unique within a frame.
#[derive(Debug, Clone, Default)]
pub struct ScopeFrame {
    bindings: HashMap<String, ExprMatrix>,
}

impl ScopeFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, failing if this frame already binds it.
    pub fn bind(&mut self, name: &Ident, matrix: ExprMatrix) -> Result<()> {
        let key = name.to_string();
        if self.bindings.contains_key(&key) {
            return Err(ExpandError::DuplicateBinding {
                name: key,
                span: name.span(),
            });
        }
        self.bindings.insert(key, matrix);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ExprMatrix> {
        self.bindings.get(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}

/// Active frames, innermost last.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Push a frame. An empty frame binds nothing and is not pushed; the
    /// return value says whether a frame was actually added.
    pub fn push(&mut self, frame: ScopeFrame) -> bool {
        if frame.is_empty() {
            return false;
        }
        self.frames.push(frame);
        true
    }

    pub fn pop(&mut self) -> Option<ScopeFrame> {
        self.frames.pop()
    }

    /// Innermost binding of `name`, if any.
    pub fn get(&self, name: &str) -> Option<&ExprMatrix> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Innermost binding of `name`; an unbound name is an error.
    pub fn lookup(&self, name: &Ident) -> Result<&ExprMatrix> {
        let key = name.to_string();
        self.get(&key).ok_or(ExpandError::UndefinedMatrix {
            name: key,
            span: name.span(),
        })
    }

    /// Open a block. Frames pushed through the returned guard are popped when
    /// it is dropped.
    pub fn enter_block(&mut self) -> BlockScope<'_> {
        let base = self.frames.len();
        BlockScope { stack: self, base }
    }
}

/// Scoped acquisition of the frames pushed while walking one block.
pub struct BlockScope<'a> {
    stack: &'a mut ScopeStack,
    base: usize,
}

impl Deref for BlockScope<'_> {
    type Target = ScopeStack;

    fn deref(&self) -> &ScopeStack {
        self.stack
    }
}

impl DerefMut for BlockScope<'_> {
    fn deref_mut(&mut self) -> &mut ScopeStack {
        self.stack
    }
}

impl Drop for BlockScope<'_> {
    fn drop(&mut self) {
        self.stack.frames.truncate(self.base);
    }
}
