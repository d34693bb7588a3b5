use std::sync::Arc;

use crate::player::DisplayObjectId;
use crate::swf::avm1::action::FunctionDecl;
use crate::swf::avm1::ActionRecord;

/// A script-defined function. Carries the constant pool and target
/// timeline that were active where it was declared; calls restore both.
pub struct Avm1Function {
    pub name: String,
    pub params: Vec<(u8, String)>,
    pub register_count: u8,
    pub flags: u16,
    pub body: Arc<Vec<ActionRecord>>,
    pub clip: DisplayObjectId,
    pub constant_pool: Arc<Vec<String>>,
}

impl Avm1Function {
    pub fn from_decl(
        decl: &FunctionDecl,
        clip: DisplayObjectId,
        constant_pool: Arc<Vec<String>>,
    ) -> Avm1Function {
        Avm1Function {
            name: decl.name.clone(),
            params: decl.params.clone(),
            register_count: decl.register_count,
            flags: decl.flags,
            body: Arc::clone(&decl.body),
            clip,
            constant_pool,
        }
    }
}
