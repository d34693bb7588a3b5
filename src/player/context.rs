use std::sync::Arc;

use fxhash::FxHashMap;
use log::warn;

use crate::player::value::Avm1Value;
use crate::player::DisplayObjectId;

pub const NUM_REGISTERS: usize = 256;

/// Scope-chain depth cap: 8 below container version 6, 16 from then on.
pub fn max_call_depth(swf_version: u8) -> u32 {
    if swf_version < 6 {
        8
    } else {
        16
    }
}

/// Per-invocation interpreter state: operand stack, register file and
/// local bindings. A fresh one is made for each function call; the
/// constant pool carries over from the definition site.
pub struct ExecutionContext {
    pub stack: Vec<Avm1Value>,
    registers: Vec<Avm1Value>,
    pub locals: FxHashMap<String, Avm1Value>,
    pub constant_pool: Arc<Vec<String>>,
    /// Timeline this execution acts on; target-switch ops move it.
    pub target: DisplayObjectId,
    /// Timeline the script belongs to; an empty target switch restores it.
    pub home: DisplayObjectId,
    pub return_value: Option<Avm1Value>,
    pub call_depth: u32,
    /// Nesting of scope-introducing blocks, capped per version.
    pub scope_depth: u32,
}

impl ExecutionContext {
    pub fn new(target: DisplayObjectId) -> ExecutionContext {
        ExecutionContext {
            stack: Vec::new(),
            registers: vec![Avm1Value::Undefined; NUM_REGISTERS],
            locals: FxHashMap::default(),
            constant_pool: Arc::new(Vec::new()),
            target,
            home: target,
            return_value: None,
            call_depth: 0,
            scope_depth: 0,
        }
    }

    pub fn push(&mut self, value: Avm1Value) {
        self.stack.push(value);
    }

    /// Popping an empty stack yields `undefined`; broken scripts limp
    /// on instead of killing the frame.
    pub fn pop(&mut self) -> Avm1Value {
        match self.stack.pop() {
            Some(value) => value,
            None => {
                warn!("Operand stack underflow");
                Avm1Value::Undefined
            }
        }
    }

    pub fn peek(&self) -> Avm1Value {
        self.stack.last().cloned().unwrap_or(Avm1Value::Undefined)
    }

    /// Register 0 is reserved; writes to it or past the file are
    /// dropped.
    pub fn set_register(&mut self, index: u8, value: Avm1Value) {
        let index = index as usize;
        if index == 0 || index >= NUM_REGISTERS {
            warn!("Register {} write out of range", index);
            return;
        }
        self.registers[index] = value;
    }

    pub fn get_register(&self, index: u8) -> Avm1Value {
        let index = index as usize;
        if index == 0 || index >= NUM_REGISTERS {
            warn!("Register {} read out of range", index);
            return Avm1Value::Undefined;
        }
        self.registers[index].clone()
    }

    pub fn pool_constant(&self, index: usize) -> Avm1Value {
        match self.constant_pool.get(index) {
            Some(s) => Avm1Value::Str(s.clone()),
            None => {
                warn!("Constant pool index {} out of range", index);
                Avm1Value::Undefined
            }
        }
    }
}
