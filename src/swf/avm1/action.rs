use std::sync::Arc;

/// One literal from a Push payload. A single Push record may carry
/// several of these back to back.
#[derive(Debug, Clone, PartialEq)]
pub enum PushValue {
    Str(String),
    Float(f32),
    Null,
    Undefined,
    Register(u8),
    Bool(bool),
    Double(f64),
    Int(i32),
    Const8(u8),
    Const16(u16),
}

/// Flags on the modern function-declaration record.
pub mod function_flags {
    pub const PRELOAD_THIS: u16 = 0x0001;
    pub const SUPPRESS_THIS: u16 = 0x0002;
    pub const PRELOAD_ARGUMENTS: u16 = 0x0004;
    pub const SUPPRESS_ARGUMENTS: u16 = 0x0008;
    pub const PRELOAD_SUPER: u16 = 0x0010;
    pub const SUPPRESS_SUPER: u16 = 0x0020;
    pub const PRELOAD_ROOT: u16 = 0x0040;
    pub const PRELOAD_PARENT: u16 = 0x0080;
    pub const PRELOAD_GLOBAL: u16 = 0x0100;
}

/// A function body declared inline in the action stream.
///
/// For the legacy record `register_count` and `flags` are zero and every
/// parameter has register 0 (named binding only).
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub register_count: u8,
    pub flags: u16,
    /// (preload register, parameter name); register 0 means name-only.
    pub params: Vec<(u8, String)>,
    pub body: Arc<Vec<ActionRecord>>,
}

/// A decoded action. Records that only exist to be skipped at execution
/// time still keep their operands so the stream stays replayable.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    NextFrame,
    PreviousFrame,
    Play,
    Stop,
    ToggleQuality,
    StopSounds,
    Add,
    Subtract,
    Multiply,
    Divide,
    Equals,
    Less,
    And,
    Or,
    Not,
    StringEquals,
    StringLength,
    StringExtract,
    Pop,
    ToInteger,
    GetVariable,
    SetVariable,
    SetTarget2,
    StringAdd,
    GetProperty,
    SetProperty,
    CloneSprite,
    RemoveSprite,
    Trace,
    StartDrag,
    EndDrag,
    StringLess,
    CastOp,
    ImplementsOp,
    RandomNumber,
    MbStringLength,
    CharToAscii,
    AsciiToChar,
    GetTime,
    MbStringExtract,
    MbCharToAscii,
    MbAsciiToChar,
    Delete,
    Delete2,
    DefineLocal,
    CallFunction,
    Return,
    Modulo,
    NewObject,
    DefineLocal2,
    InitArray,
    InitObject,
    TypeOf,
    TargetPath,
    Enumerate,
    Add2,
    Less2,
    Equals2,
    ToNumber,
    ToString,
    PushDuplicate,
    StackSwap,
    GetMember,
    SetMember,
    Increment,
    Decrement,
    CallMethod,
    NewMethod,
    InstanceOf,
    Enumerate2,
    BitAnd,
    BitOr,
    BitXor,
    BitLShift,
    BitRShift,
    BitURShift,
    StrictEquals,
    Greater,
    StringGreater,
    Extends,
    GotoFrame(u16),
    GetUrl { url: String, target: String },
    StoreRegister(u8),
    ConstantPool(Vec<String>),
    WaitForFrame { frame: u16, skip_count: u8 },
    SetTarget(String),
    GotoLabel(String),
    WaitForFrame2 { skip_count: u8 },
    DefineFunction2(FunctionDecl),
    With { body: Arc<Vec<ActionRecord>> },
    Push(Vec<PushValue>),
    Jump(i16),
    GetUrl2 { flags: u8 },
    DefineFunction(FunctionDecl),
    If(i16),
    Call,
    GotoFrame2 { play: bool, scene_bias: u16 },
}

/// An action plus the number of stream bytes it occupied, header
/// included. Branch offsets resolve against these lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub action: Action,
    pub encoded_len: usize,
}
