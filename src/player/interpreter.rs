use std::sync::Arc;

use fxhash::FxHashMap;
use log::{debug, error, info, warn};

use crate::player::context::{max_call_depth, ExecutionContext};
use crate::player::function::Avm1Function;
use crate::player::movie_clip::{goto_frame, resolve_frame_target};
use crate::player::object::ScriptObject;
use crate::player::value::Avm1Value;
use crate::player::{DisplayObjectId, FunctionId, PlayerContext, ScriptError};
use crate::swf::avm1::action::{function_flags, FunctionDecl, PushValue};
use crate::swf::avm1::{Action, ActionRecord};
use crate::utils::{name_eq, px_to_twips, twips_to_px};

const MAX_RECURSION: u32 = 256;

// Scripts run on their own thread with room for MAX_RECURSION nested
// calls, so the depth guard trips before the native stack runs out.
const SCRIPT_STACK_SIZE: usize = 32 * 1024 * 1024;

enum Flow {
    Next,
    Jump(i32),
    SkipNext(usize),
    Return,
}

/// Runs a top-level action sequence against a timeline.
pub fn run_actions(
    ctx: &mut PlayerContext,
    clip: DisplayObjectId,
    records: &[ActionRecord],
) -> Result<(), ScriptError> {
    std::thread::scope(|scope| {
        let worker = std::thread::Builder::new()
            .name("avm1-script".to_string())
            .stack_size(SCRIPT_STACK_SIZE)
            .spawn_scoped(scope, move || {
                let mut ectx = ExecutionContext::new(clip);
                execute(ctx, records, &mut ectx).map(|_| ())
            })
            .map_err(|e| ScriptError::new(format!("Failed to spawn script thread: {}", e)))?;
        worker
            .join()
            .unwrap_or_else(|_| Err(ScriptError::new("Script thread panicked")))
    })
}

/// Interprets records until the end of the sequence or a return.
fn execute(
    ctx: &mut PlayerContext,
    records: &[ActionRecord],
    ectx: &mut ExecutionContext,
) -> Result<Option<Avm1Value>, ScriptError> {
    let mut pc = 0usize;
    while pc < records.len() {
        match exec_action(ctx, ectx, &records[pc].action)? {
            Flow::Next => pc += 1,
            Flow::Jump(offset) => pc = resolve_jump(records, pc, offset),
            Flow::SkipNext(count) => pc = (pc + 1 + count).min(records.len()),
            Flow::Return => return Ok(ectx.return_value.take()),
        }
    }
    Ok(None)
}

/// Maps a byte offset, measured from the end of the branching record,
/// onto a record index. A target that misses every record boundary
/// clamps to the nearest boundary short of it, in the branch's own
/// direction.
fn resolve_jump(records: &[ActionRecord], from: usize, offset: i32) -> usize {
    let offset = offset as i64;
    if offset >= 0 {
        let mut acc: i64 = 0;
        let mut index = from + 1;
        while index < records.len() && acc < offset {
            acc += records[index].encoded_len as i64;
            index += 1;
        }
        if acc != offset {
            error!("Branch target {} bytes ahead misses record boundary", offset);
            if acc > offset && index > 0 {
                index -= 1;
            }
        }
        index
    } else {
        let mut acc: i64 = 0;
        let mut index = from + 1;
        while index > 0 && acc > offset {
            index -= 1;
            acc -= records[index].encoded_len as i64;
        }
        if acc != offset {
            error!(
                "Branch target {} bytes back misses record boundary",
                offset
            );
            if acc < offset && index < records.len() {
                index += 1;
            }
        }
        index
    }
}

fn exec_action(
    ctx: &mut PlayerContext,
    ectx: &mut ExecutionContext,
    action: &Action,
) -> Result<Flow, ScriptError> {
    let version = ctx.swf_version;
    match action {
        // -------- stack --------
        Action::Push(values) => {
            for value in values {
                let pushed = match value {
                    PushValue::Str(s) => Avm1Value::Str(s.clone()),
                    PushValue::Float(f) => Avm1Value::Double(*f as f64),
                    PushValue::Null => Avm1Value::Null,
                    PushValue::Undefined => Avm1Value::Undefined,
                    PushValue::Register(r) => ectx.get_register(*r),
                    PushValue::Bool(b) => Avm1Value::Bool(*b),
                    PushValue::Double(d) => Avm1Value::Double(*d),
                    PushValue::Int(i) => Avm1Value::Int(*i),
                    PushValue::Const8(i) => ectx.pool_constant(*i as usize),
                    PushValue::Const16(i) => ectx.pool_constant(*i as usize),
                };
                ectx.push(pushed);
            }
        }
        Action::Pop => {
            ectx.pop();
        }
        Action::PushDuplicate => {
            let top = ectx.peek();
            ectx.push(top);
        }
        Action::StackSwap => {
            let a = ectx.pop();
            let b = ectx.pop();
            ectx.push(a);
            ectx.push(b);
        }
        Action::StoreRegister(register) => {
            let top = ectx.peek();
            ectx.set_register(*register, top);
        }
        Action::ConstantPool(pool) => {
            ectx.constant_pool = Arc::new(pool.clone());
        }

        // -------- arithmetic --------
        Action::Add => binary_number(ectx, version, |a, b| a + b),
        Action::Subtract => binary_number(ectx, version, |a, b| a - b),
        Action::Multiply => binary_number(ectx, version, |a, b| a * b),
        Action::Divide => binary_number(ectx, version, |a, b| a / b),
        Action::Modulo => binary_number(ectx, version, |a, b| a % b),
        Action::Add2 => {
            let b = ectx.pop();
            let a = ectx.pop();
            match (&a, &b) {
                (Avm1Value::Str(_), _) | (_, Avm1Value::Str(_)) => {
                    let mut s = a.coerce_to_string();
                    s.push_str(&b.coerce_to_string());
                    ectx.push(Avm1Value::Str(s));
                }
                _ => {
                    let sum = a.to_number(version) + b.to_number(version);
                    ectx.push(Avm1Value::from_f64(sum));
                }
            }
        }
        Action::Increment => {
            let n = ectx.pop().to_number(version);
            ectx.push(Avm1Value::from_f64(n + 1.0));
        }
        Action::Decrement => {
            let n = ectx.pop().to_number(version);
            ectx.push(Avm1Value::from_f64(n - 1.0));
        }
        Action::ToInteger => {
            let n = ectx.pop().to_number(version);
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            ectx.push(Avm1Value::Int(n as i64 as i32));
        }
        Action::ToNumber => {
            let n = ectx.pop().to_number(version);
            ectx.push(Avm1Value::from_f64(n));
        }
        Action::ToString => {
            let s = ectx.pop().coerce_to_string();
            ectx.push(Avm1Value::Str(s));
        }

        // -------- comparison and logic --------
        Action::Equals => binary_compare(ectx, version, |a, b| a == b),
        Action::Less => binary_compare(ectx, version, |a, b| a < b),
        Action::Equals2 => {
            let b = ectx.pop();
            let a = ectx.pop();
            let eq = a.abstract_eq(&b, version);
            ectx.push(Avm1Value::Bool(eq));
        }
        Action::StrictEquals => {
            let b = ectx.pop();
            let a = ectx.pop();
            ectx.push(Avm1Value::Bool(a.strict_eq(&b)));
        }
        Action::Less2 => typed_relational(ectx, version, false),
        Action::Greater => typed_relational(ectx, version, true),
        Action::And => binary_logic(ectx, version, |a, b| a && b),
        Action::Or => binary_logic(ectx, version, |a, b| a || b),
        Action::Not => {
            let v = ectx.pop().to_bool(version);
            ectx.push(Avm1Value::Bool(!v));
        }

        // -------- bitwise --------
        Action::BitAnd => binary_i32(ectx, version, |a, b| a & b),
        Action::BitOr => binary_i32(ectx, version, |a, b| a | b),
        Action::BitXor => binary_i32(ectx, version, |a, b| a ^ b),
        Action::BitLShift => binary_i32(ectx, version, |a, b| a.wrapping_shl(b as u32 & 31)),
        Action::BitRShift => binary_i32(ectx, version, |a, b| a.wrapping_shr(b as u32 & 31)),
        Action::BitURShift => {
            let b = ectx.pop().to_i32(version) as u32 & 31;
            let a = ectx.pop().to_i32(version) as u32;
            ectx.push(Avm1Value::from_f64((a >> b) as f64));
        }

        // -------- strings --------
        Action::StringAdd => {
            let b = ectx.pop().coerce_to_string();
            let mut a = ectx.pop().coerce_to_string();
            a.push_str(&b);
            ectx.push(Avm1Value::Str(a));
        }
        Action::StringEquals => {
            let b = ectx.pop().coerce_to_string();
            let a = ectx.pop().coerce_to_string();
            ectx.push(Avm1Value::Bool(a == b));
        }
        Action::StringLess => {
            let b = ectx.pop().coerce_to_string();
            let a = ectx.pop().coerce_to_string();
            ectx.push(Avm1Value::Bool(a < b));
        }
        Action::StringGreater => {
            let b = ectx.pop().coerce_to_string();
            let a = ectx.pop().coerce_to_string();
            ectx.push(Avm1Value::Bool(a > b));
        }
        Action::StringLength | Action::MbStringLength => {
            let s = ectx.pop().coerce_to_string();
            ectx.push(Avm1Value::Int(s.chars().count() as i32));
        }
        Action::StringExtract | Action::MbStringExtract => {
            // count, then 1-based index, then the string
            let count = ectx.pop().to_i32(version);
            let index = ectx.pop().to_i32(version);
            let s = ectx.pop().coerce_to_string();
            let start = (index.max(1) - 1) as usize;
            let extracted: String = s
                .chars()
                .skip(start)
                .take(count.max(0) as usize)
                .collect();
            ectx.push(Avm1Value::Str(extracted));
        }
        Action::CharToAscii | Action::MbCharToAscii => {
            let s = ectx.pop().coerce_to_string();
            let code = s.chars().next().map(|c| c as u32).unwrap_or(0);
            ectx.push(Avm1Value::Int(code as i32));
        }
        Action::AsciiToChar | Action::MbAsciiToChar => {
            let code = ectx.pop().to_i32(version) as u32;
            let s = char::from_u32(code)
                .map(|c| c.to_string())
                .unwrap_or_default();
            ectx.push(Avm1Value::Str(s));
        }

        // -------- variables and members --------
        Action::GetVariable => {
            let name = ectx.pop().coerce_to_string();
            let value = get_variable(ctx, ectx, &name);
            ectx.push(value);
        }
        Action::SetVariable => {
            let value = ectx.pop();
            let name = ectx.pop().coerce_to_string();
            set_variable(ctx, ectx, &name, value);
        }
        Action::DefineLocal => {
            let value = ectx.pop();
            let name = ectx.pop().coerce_to_string();
            ectx.locals.insert(name, value);
        }
        Action::DefineLocal2 => {
            let name = ectx.pop().coerce_to_string();
            if !ectx.locals.contains_key(&name) {
                ectx.locals.insert(name, Avm1Value::Undefined);
            }
        }
        Action::GetMember => {
            let name = ectx.pop().coerce_to_string();
            let object = ectx.pop();
            let value = get_member(ctx, &object, &name);
            ectx.push(value);
        }
        Action::SetMember => {
            let value = ectx.pop();
            let name = ectx.pop().coerce_to_string();
            let object = ectx.pop();
            set_member(ctx, &object, &name, value);
        }
        Action::Delete => {
            let name = ectx.pop().coerce_to_string();
            let object = ectx.pop();
            let deleted = match object {
                Avm1Value::Object(id) => {
                    let case_sensitive = ctx.case_sensitive();
                    ctx.objects
                        .get_mut(id)
                        .map(|obj| obj.delete(&name, case_sensitive))
                        .unwrap_or(false)
                }
                _ => false,
            };
            ectx.push(Avm1Value::Bool(deleted));
        }
        Action::Delete2 => {
            let name = ectx.pop().coerce_to_string();
            let case_sensitive = ctx.case_sensitive();
            let mut deleted = map_remove(&mut ectx.locals, &name, case_sensitive);
            if !deleted {
                if let Some(object) = ctx.display_objects.get_mut(ectx.target) {
                    deleted = map_remove(&mut object.variables, &name, case_sensitive);
                }
            }
            ectx.push(Avm1Value::Bool(deleted));
        }
        Action::Enumerate => {
            let name = ectx.pop().coerce_to_string();
            let value = get_variable(ctx, ectx, &name);
            push_enumeration(ctx, ectx, &value);
        }
        Action::Enumerate2 => {
            let value = ectx.pop();
            push_enumeration(ctx, ectx, &value);
        }

        // -------- indexed clip properties --------
        Action::GetProperty => {
            let index = ectx.pop().to_i32(version);
            let path = ectx.pop().coerce_to_string();
            let clip = resolve_clip_path(ctx, ectx, &path);
            let value = match clip {
                Some(clip) => get_clip_property(ctx, clip, index),
                None => {
                    warn!("Property read on unknown target '{}'", path);
                    Avm1Value::Undefined
                }
            };
            ectx.push(value);
        }
        Action::SetProperty => {
            let value = ectx.pop();
            let index = ectx.pop().to_i32(version);
            let path = ectx.pop().coerce_to_string();
            match resolve_clip_path(ctx, ectx, &path) {
                Some(clip) => set_clip_property(ctx, clip, index, value),
                None => warn!("Property write on unknown target '{}'", path),
            }
        }

        // -------- control flow --------
        Action::Jump(offset) => return Ok(Flow::Jump(*offset as i32)),
        Action::If(offset) => {
            let cond = ectx.pop().to_bool(version);
            if cond {
                return Ok(Flow::Jump(*offset as i32));
            }
        }
        Action::Return => {
            let value = ectx.pop();
            ectx.return_value = Some(value);
            return Ok(Flow::Return);
        }
        Action::With { body } => {
            // scope objects are not modeled; the body runs in the
            // enclosing scope
            if ectx.scope_depth >= max_call_depth(version) {
                error!("Scope nesting limit reached, skipping block");
            } else {
                debug!("With block scope flattened");
                ectx.scope_depth += 1;
                let result = execute(ctx, body, ectx);
                ectx.scope_depth -= 1;
                if let Some(value) = result? {
                    ectx.return_value = Some(value);
                    return Ok(Flow::Return);
                }
            }
        }

        // -------- functions --------
        Action::DefineFunction(decl) | Action::DefineFunction2(decl) => {
            define_function(ctx, ectx, decl);
        }
        Action::CallFunction => {
            let name = ectx.pop().coerce_to_string();
            let args = pop_args(ectx, version);
            let callee = get_variable(ctx, ectx, &name);
            let result = match callee {
                Avm1Value::Function(fid) => call_function(
                    ctx,
                    fid,
                    Avm1Value::Clip(ectx.target),
                    args,
                    ectx.call_depth + 1,
                )?,
                _ => {
                    warn!("Call of undefined function '{}'", name);
                    Avm1Value::Undefined
                }
            };
            ectx.push(result);
        }
        Action::CallMethod => {
            let name = ectx.pop().coerce_to_string();
            let object = ectx.pop();
            let args = pop_args(ectx, version);
            let result = call_method(ctx, ectx, &object, &name, args)?;
            ectx.push(result);
        }
        Action::NewObject => {
            let name = ectx.pop().coerce_to_string();
            let args = pop_args(ectx, version);
            let result = construct_by_name(ctx, ectx, &name, args)?;
            ectx.push(result);
        }
        Action::NewMethod => {
            let name = ectx.pop().coerce_to_string();
            let object = ectx.pop();
            let args = pop_args(ectx, version);
            let ctor = if name.is_empty() {
                object.clone()
            } else {
                get_member(ctx, &object, &name)
            };
            let result = construct(ctx, &ctor, args, ectx.call_depth + 1)?;
            ectx.push(result);
        }
        Action::InitArray => {
            let count = ectx.pop().to_i32(version).max(0) as usize;
            let mut array = ScriptObject::new_array(count);
            for index in 0..count {
                let element = ectx.pop();
                array.set(&index.to_string(), element, true);
            }
            let id = ctx.objects.alloc(array);
            ectx.push(Avm1Value::Object(id));
        }
        Action::InitObject => {
            let count = ectx.pop().to_i32(version).max(0) as usize;
            let mut object = ScriptObject::new();
            let case_sensitive = ctx.case_sensitive();
            for _ in 0..count {
                let value = ectx.pop();
                let name = ectx.pop().coerce_to_string();
                object.set(&name, value, case_sensitive);
            }
            let id = ctx.objects.alloc(object);
            ectx.push(Avm1Value::Object(id));
        }
        Action::TypeOf => {
            let value = ectx.pop();
            ectx.push(Avm1Value::Str(value.type_of().to_string()));
        }

        // -------- timeline control --------
        Action::Play => set_stopped(ctx, ectx.target, false),
        Action::Stop => set_stopped(ctx, ectx.target, true),
        Action::NextFrame => {
            let fp = current_frame(ctx, ectx.target);
            goto_frame(ctx, ectx.target, fp + 1, false);
        }
        Action::PreviousFrame => {
            let fp = current_frame(ctx, ectx.target);
            goto_frame(ctx, ectx.target, fp.saturating_sub(1), false);
        }
        Action::GotoFrame(frame) => {
            let playing = is_playing(ctx, ectx.target);
            goto_frame(ctx, ectx.target, *frame as u32, playing);
        }
        Action::GotoLabel(label) => {
            let playing = is_playing(ctx, ectx.target);
            let dest = resolve_frame_target(
                ctx,
                ectx.target,
                &Avm1Value::Str(label.clone()),
                None,
            );
            goto_frame(ctx, ectx.target, dest, playing);
        }
        Action::GotoFrame2 { play, scene_bias } => {
            let target = ectx.pop();
            let dest =
                resolve_frame_target(ctx, ectx.target, &target, Some(*scene_bias as u32));
            goto_frame(ctx, ectx.target, dest, *play);
        }
        Action::Call => {
            // legacy frame call: run the named frame's scripts in place
            let target = ectx.pop();
            let dest = resolve_frame_target(ctx, ectx.target, &target, None);
            let scripts = ctx
                .get_clip(ectx.target)
                .and_then(|clip| clip.frames.get(dest as usize))
                .map(|frame| frame.scripts.clone())
                .unwrap_or_default();
            for script in scripts {
                if let Some(value) = execute(ctx, &script, ectx)? {
                    ectx.return_value = Some(value);
                    return Ok(Flow::Return);
                }
            }
        }
        Action::WaitForFrame { frame, skip_count } => {
            let loaded = frames_loaded(ctx, ectx.target);
            if (*frame as usize) >= loaded {
                return Ok(Flow::SkipNext(*skip_count as usize));
            }
        }
        Action::WaitForFrame2 { skip_count } => {
            let target = ectx.pop();
            let dest = resolve_frame_target(ctx, ectx.target, &target, None);
            let loaded = frames_loaded(ctx, ectx.target);
            if (dest as usize) >= loaded {
                return Ok(Flow::SkipNext(*skip_count as usize));
            }
        }
        Action::SetTarget(path) => retarget(ctx, ectx, path),
        Action::SetTarget2 => {
            let path = ectx.pop().coerce_to_string();
            retarget(ctx, ectx, &path);
        }

        // -------- host facilities --------
        Action::Trace => {
            let message = ectx.pop().coerce_to_string();
            info!("trace: {}", message);
            ctx.trace_log.push(message);
        }
        Action::GetTime => {
            let elapsed = ctx.elapsed_ms();
            ectx.push(Avm1Value::from_f64(elapsed as f64));
        }
        Action::RandomNumber => {
            let max = ectx.pop().to_i32(version);
            let value = ctx.next_random(max);
            ectx.push(Avm1Value::Int(value));
        }
        Action::GetUrl { url, target } => {
            info!("getURL '{}' -> '{}' ignored", url, target);
        }
        Action::GetUrl2 { .. } => {
            let target = ectx.pop().coerce_to_string();
            let url = ectx.pop().coerce_to_string();
            info!("getURL '{}' -> '{}' ignored", url, target);
        }
        Action::StopSounds => {
            ctx.sound_requests.clear();
            debug!("stopAllSounds");
        }
        Action::ToggleQuality => debug!("toggleQuality ignored"),

        // -------- unsupported surface --------
        Action::CloneSprite => {
            let _depth = ectx.pop();
            let _target = ectx.pop();
            let _source = ectx.pop();
            warn!("cloneSprite not supported");
        }
        Action::RemoveSprite => {
            let _target = ectx.pop();
            warn!("removeSprite not supported");
        }
        Action::StartDrag => {
            let _target = ectx.pop();
            let _lock = ectx.pop();
            let constrain = ectx.pop().to_bool(version);
            if constrain {
                for _ in 0..4 {
                    ectx.pop();
                }
            }
            warn!("startDrag not supported");
        }
        Action::EndDrag => warn!("endDrag not supported"),
        Action::TargetPath => {
            let value = ectx.pop();
            let path = match value {
                Avm1Value::Clip(id) => Avm1Value::Str(target_path(ctx, id)),
                _ => Avm1Value::Undefined,
            };
            ectx.push(path);
        }
        Action::InstanceOf => {
            let _ctor = ectx.pop();
            let _object = ectx.pop();
            warn!("instanceof not supported");
            ectx.push(Avm1Value::Bool(false));
        }
        Action::CastOp => {
            let _object = ectx.pop();
            let _ctor = ectx.pop();
            warn!("cast not supported");
            ectx.push(Avm1Value::Null);
        }
        Action::ImplementsOp => {
            let _ctor = ectx.pop();
            let count = ectx.pop().to_i32(version).max(0);
            for _ in 0..count {
                ectx.pop();
            }
            warn!("implements not supported");
        }
        Action::Extends => {
            let _superclass = ectx.pop();
            let _subclass = ectx.pop();
            warn!("extends not supported");
        }
    }
    Ok(Flow::Next)
}

// ---------------------------------------------------------------- helpers

fn binary_number<F: Fn(f64, f64) -> f64>(
    ectx: &mut ExecutionContext,
    version: u8,
    op: F,
) {
    let b = ectx.pop().to_number(version);
    let a = ectx.pop().to_number(version);
    ectx.push(Avm1Value::from_f64(op(a, b)));
}

fn binary_compare<F: Fn(f64, f64) -> bool>(
    ectx: &mut ExecutionContext,
    version: u8,
    op: F,
) {
    let b = ectx.pop().to_number(version);
    let a = ectx.pop().to_number(version);
    ectx.push(Avm1Value::Bool(op(a, b)));
}

fn binary_logic<F: Fn(bool, bool) -> bool>(
    ectx: &mut ExecutionContext,
    version: u8,
    op: F,
) {
    let b = ectx.pop().to_bool(version);
    let a = ectx.pop().to_bool(version);
    ectx.push(Avm1Value::Bool(op(a, b)));
}

fn binary_i32<F: Fn(i32, i32) -> i32>(ectx: &mut ExecutionContext, version: u8, op: F) {
    let b = ectx.pop().to_i32(version);
    let a = ectx.pop().to_i32(version);
    ectx.push(Avm1Value::Int(op(a, b)));
}

/// The ordered relational op: string-vs-string compares lexically, any
/// other pairing numerically. NaN comparisons are false.
fn typed_relational(ectx: &mut ExecutionContext, version: u8, greater: bool) {
    let b = ectx.pop();
    let a = ectx.pop();
    let result = match (&a, &b) {
        (Avm1Value::Str(x), Avm1Value::Str(y)) => {
            if greater {
                x > y
            } else {
                x < y
            }
        }
        _ => {
            let x = a.to_number(version);
            let y = b.to_number(version);
            if x.is_nan() || y.is_nan() {
                false
            } else if greater {
                x > y
            } else {
                x < y
            }
        }
    };
    ectx.push(Avm1Value::Bool(result));
}

fn pop_args(ectx: &mut ExecutionContext, version: u8) -> Vec<Avm1Value> {
    let count = ectx.pop().to_i32(version).max(0) as usize;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        args.push(ectx.pop());
    }
    args
}

fn map_get<'a>(
    map: &'a FxHashMap<String, Avm1Value>,
    name: &str,
    case_sensitive: bool,
) -> Option<&'a Avm1Value> {
    if let Some(value) = map.get(name) {
        return Some(value);
    }
    if !case_sensitive {
        map.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    } else {
        None
    }
}

fn map_set(
    map: &mut FxHashMap<String, Avm1Value>,
    name: &str,
    value: Avm1Value,
    case_sensitive: bool,
) {
    if !case_sensitive && !map.contains_key(name) {
        let existing = map
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned();
        if let Some(key) = existing {
            map.insert(key, value);
            return;
        }
    }
    map.insert(name.to_string(), value);
}

fn map_remove(
    map: &mut FxHashMap<String, Avm1Value>,
    name: &str,
    case_sensitive: bool,
) -> bool {
    if map.remove(name).is_some() {
        return true;
    }
    if !case_sensitive {
        let existing = map
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned();
        if let Some(key) = existing {
            map.remove(&key);
            return true;
        }
    }
    false
}

/// Name lookup order: locals, special names, builtin clip properties,
/// the target's child clips, its variables, then globals.
fn get_variable(ctx: &PlayerContext, ectx: &ExecutionContext, name: &str) -> Avm1Value {
    if name.contains('/') || name.contains(':') {
        return slash_path_get(ctx, ectx, name);
    }
    if let Some(dot) = name.find('.') {
        let (head, rest) = (&name[..dot], &name[dot + 1..]);
        if name_eq(head, "_global", false) {
            return dotted_get(ctx, global_member(ctx, rest_head(rest)), rest_tail(rest));
        }
        let base = get_variable(ctx, ectx, head);
        return dotted_get(ctx, get_member(ctx, &base, rest_head(rest)), rest_tail(rest));
    }
    let case_sensitive = ctx.case_sensitive();
    if let Some(value) = map_get(&ectx.locals, name, case_sensitive) {
        return value.clone();
    }
    if name_eq(name, "this", case_sensitive) {
        return Avm1Value::Clip(ectx.target);
    }
    if name_eq(name, "_root", false) {
        return Avm1Value::Clip(ctx.root);
    }
    if name_eq(name, "_parent", false) {
        return ctx
            .display_objects
            .get(ectx.target)
            .and_then(|obj| obj.parent)
            .map(Avm1Value::Clip)
            .unwrap_or(Avm1Value::Undefined);
    }
    let clip_value = get_member(ctx, &Avm1Value::Clip(ectx.target), name);
    if clip_value != Avm1Value::Undefined {
        return clip_value;
    }
    map_get(&ctx.globals, name, case_sensitive)
        .cloned()
        .unwrap_or(Avm1Value::Undefined)
}

fn rest_head(rest: &str) -> &str {
    match rest.find('.') {
        Some(dot) => &rest[..dot],
        None => rest,
    }
}

fn rest_tail(rest: &str) -> Option<&str> {
    rest.find('.').map(|dot| &rest[dot + 1..])
}

fn dotted_get(ctx: &PlayerContext, base: Avm1Value, tail: Option<&str>) -> Avm1Value {
    match tail {
        None => base,
        Some(tail) => {
            let next = get_member(ctx, &base, rest_head(tail));
            dotted_get(ctx, next, rest_tail(tail))
        }
    }
}

fn global_member(ctx: &PlayerContext, name: &str) -> Avm1Value {
    map_get(&ctx.globals, name, ctx.case_sensitive())
        .cloned()
        .unwrap_or(Avm1Value::Undefined)
}

fn set_variable(
    ctx: &mut PlayerContext,
    ectx: &mut ExecutionContext,
    name: &str,
    value: Avm1Value,
) {
    if name.contains('/') || name.contains(':') {
        slash_path_set(ctx, ectx, name, value);
        return;
    }
    let case_sensitive = ctx.case_sensitive();
    if let Some(dot) = name.rfind('.') {
        let (head, member) = (&name[..dot], &name[dot + 1..]);
        if name_eq(head, "_global", false) {
            map_set(&mut ctx.globals, member, value, case_sensitive);
            return;
        }
        let base = get_variable(ctx, ectx, head);
        set_member(ctx, &base, member, value);
        return;
    }
    if map_get(&ectx.locals, name, case_sensitive).is_some() {
        map_set(&mut ectx.locals, name, value, case_sensitive);
        return;
    }
    if let Some(index) = builtin_property_index(name) {
        set_clip_property(ctx, ectx.target, index, value);
        return;
    }
    let target = ectx.target;
    if let Some(object) = ctx.display_objects.get_mut(target) {
        map_set(&mut object.variables, name, value, case_sensitive);
    }
}

/// Legacy slash/colon syntax: `/a/b:var` walks clips from the root,
/// `../` climbs, the colon part names a variable on the final clip.
fn split_slash_path(path: &str) -> (&str, Option<&str>) {
    match path.rfind(':') {
        Some(colon) => (&path[..colon], Some(&path[colon + 1..])),
        None => (path, None),
    }
}

fn walk_slash_path(
    ctx: &PlayerContext,
    ectx: &ExecutionContext,
    path: &str,
) -> Option<DisplayObjectId> {
    let mut current = if path.starts_with('/') {
        ctx.root
    } else {
        ectx.target
    };
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            current = ctx.display_objects.get(current).and_then(|obj| obj.parent)?;
            continue;
        }
        current = child_clip_by_name(ctx, current, segment)?;
    }
    Some(current)
}

fn slash_path_get(ctx: &PlayerContext, ectx: &ExecutionContext, path: &str) -> Avm1Value {
    let (clip_part, var_part) = split_slash_path(path);
    let clip = match walk_slash_path(ctx, ectx, clip_part) {
        Some(clip) => clip,
        None => {
            warn!("Path '{}' resolves to no timeline", path);
            return Avm1Value::Undefined;
        }
    };
    match var_part {
        Some(var) => ctx
            .display_objects
            .get(clip)
            .and_then(|obj| map_get(&obj.variables, var, ctx.case_sensitive()).cloned())
            .unwrap_or(Avm1Value::Undefined),
        None => Avm1Value::Clip(clip),
    }
}

fn slash_path_set(
    ctx: &mut PlayerContext,
    ectx: &ExecutionContext,
    path: &str,
    value: Avm1Value,
) {
    let (clip_part, var_part) = split_slash_path(path);
    let clip = match walk_slash_path(ctx, ectx, clip_part) {
        Some(clip) => clip,
        None => {
            warn!("Path '{}' resolves to no timeline", path);
            return;
        }
    };
    let var = match var_part {
        Some(var) => var,
        None => {
            warn!("Assignment to bare path '{}'", path);
            return;
        }
    };
    let case_sensitive = ctx.case_sensitive();
    if let Some(object) = ctx.display_objects.get_mut(clip) {
        map_set(&mut object.variables, var, value, case_sensitive);
    }
}

fn child_clip_by_name(
    ctx: &PlayerContext,
    parent: DisplayObjectId,
    name: &str,
) -> Option<DisplayObjectId> {
    let clip = ctx.get_clip(parent)?;
    let case_sensitive = ctx.case_sensitive();
    clip.display_list.ids().into_iter().find(|child| {
        ctx.display_objects
            .get(*child)
            .and_then(|obj| obj.name.as_deref())
            .map(|n| name_eq(n, name, case_sensitive))
            .unwrap_or(false)
    })
}

/// Target for the target-switch ops; an empty path restores the
/// script's own timeline. An unresolvable path leaves the target alone.
fn retarget(ctx: &PlayerContext, ectx: &mut ExecutionContext, path: &str) {
    if path.is_empty() {
        ectx.target = ectx.home;
        return;
    }
    match resolve_clip_path(ctx, ectx, path) {
        Some(clip) => ectx.target = clip,
        None => warn!("setTarget '{}' resolves to no timeline", path),
    }
}

fn resolve_clip_path(
    ctx: &PlayerContext,
    ectx: &ExecutionContext,
    path: &str,
) -> Option<DisplayObjectId> {
    if path.is_empty() {
        return Some(ectx.target);
    }
    if path.contains('/') {
        return walk_slash_path(ctx, ectx, path);
    }
    let mut current = ectx.target;
    for segment in path.split('.') {
        if name_eq(segment, "_root", false) {
            current = ctx.root;
        } else if name_eq(segment, "_parent", false) {
            current = ctx.display_objects.get(current).and_then(|obj| obj.parent)?;
        } else {
            current = child_clip_by_name(ctx, current, segment)?;
        }
    }
    Some(current)
}

pub fn get_member(ctx: &PlayerContext, value: &Avm1Value, name: &str) -> Avm1Value {
    let case_sensitive = ctx.case_sensitive();
    match value {
        Avm1Value::Object(id) => {
            let mut current = Some(*id);
            let mut hops = 0;
            while let Some(object_id) = current {
                let object = match ctx.objects.get(object_id) {
                    Some(object) => object,
                    None => break,
                };
                if let Some(found) = object.get_own(name, case_sensitive) {
                    return found.clone();
                }
                current = object.prototype;
                hops += 1;
                if hops > 255 {
                    warn!("Prototype chain too deep");
                    break;
                }
            }
            Avm1Value::Undefined
        }
        Avm1Value::Clip(id) => {
            if let Some(index) = builtin_property_index(name) {
                return get_clip_property(ctx, *id, index);
            }
            if let Some(child) = child_clip_by_name(ctx, *id, name) {
                return Avm1Value::Clip(child);
            }
            ctx.display_objects
                .get(*id)
                .and_then(|obj| map_get(&obj.variables, name, case_sensitive).cloned())
                .unwrap_or(Avm1Value::Undefined)
        }
        Avm1Value::Str(s) => {
            if name_eq(name, "length", case_sensitive) {
                Avm1Value::Int(s.chars().count() as i32)
            } else {
                Avm1Value::Undefined
            }
        }
        _ => Avm1Value::Undefined,
    }
}

pub fn set_member(ctx: &mut PlayerContext, value: &Avm1Value, name: &str, new: Avm1Value) {
    let case_sensitive = ctx.case_sensitive();
    match value {
        Avm1Value::Object(id) => {
            if let Some(object) = ctx.objects.get_mut(*id) {
                object.set(name, new, case_sensitive);
            }
        }
        Avm1Value::Clip(id) => {
            if let Some(index) = builtin_property_index(name) {
                set_clip_property(ctx, *id, index, new);
                return;
            }
            if let Some(object) = ctx.display_objects.get_mut(*id) {
                map_set(&mut object.variables, name, new, case_sensitive);
            }
        }
        other => warn!("Member write on {}", other.type_of()),
    }
}

/// The classic numbered property table. Names map onto the same
/// indices the indexed property ops use.
fn builtin_property_index(name: &str) -> Option<i32> {
    let index = match name.to_ascii_lowercase().as_str() {
        "_x" => 0,
        "_y" => 1,
        "_xscale" => 2,
        "_yscale" => 3,
        "_currentframe" => 4,
        "_totalframes" => 5,
        "_alpha" => 6,
        "_visible" => 7,
        "_rotation" => 10,
        "_target" => 11,
        "_framesloaded" => 12,
        "_name" => 13,
        "_url" => 15,
        _ => return None,
    };
    Some(index)
}

pub fn get_clip_property(ctx: &PlayerContext, id: DisplayObjectId, index: i32) -> Avm1Value {
    let object = match ctx.display_objects.get(id) {
        Some(object) => object,
        None => return Avm1Value::Undefined,
    };
    match index {
        0 => Avm1Value::from_f64(twips_to_px(object.matrix.translate_x)),
        1 => Avm1Value::from_f64(twips_to_px(object.matrix.translate_y)),
        2 => Avm1Value::from_f64(object.matrix.scale_x as f64 * 100.0),
        3 => Avm1Value::from_f64(object.matrix.scale_y as f64 * 100.0),
        4 => match object.as_clip() {
            Some(clip) => Avm1Value::Int(clip.state.fp as i32 + 1),
            None => Avm1Value::Undefined,
        },
        5 => match object.as_clip() {
            Some(clip) => Avm1Value::Int(clip.frames_total() as i32),
            None => Avm1Value::Undefined,
        },
        6 => Avm1Value::from_f64(object.color_transform.mult[3] as f64 * 100.0),
        7 => Avm1Value::Bool(object.visible),
        11 => Avm1Value::Str(target_path(ctx, id)),
        12 => match object.as_clip() {
            Some(clip) => Avm1Value::Int(clip.frames_loaded() as i32),
            None => Avm1Value::Undefined,
        },
        13 => Avm1Value::Str(object.name.clone().unwrap_or_default()),
        15 => Avm1Value::Str(String::new()),
        _ => {
            warn!("Property {} not supported", index);
            Avm1Value::Undefined
        }
    }
}

pub fn set_clip_property(
    ctx: &mut PlayerContext,
    id: DisplayObjectId,
    index: i32,
    value: Avm1Value,
) {
    let version = ctx.swf_version;
    let object = match ctx.display_objects.get_mut(id) {
        Some(object) => object,
        None => return,
    };
    match index {
        0 => object.matrix.translate_x = px_to_twips(value.to_number(version)),
        1 => object.matrix.translate_y = px_to_twips(value.to_number(version)),
        2 => object.matrix.scale_x = (value.to_number(version) / 100.0) as f32,
        3 => object.matrix.scale_y = (value.to_number(version) / 100.0) as f32,
        6 => object.color_transform.mult[3] = (value.to_number(version) / 100.0) as f32,
        7 => object.visible = value.to_bool(version),
        13 => object.name = Some(value.coerce_to_string()),
        _ => warn!("Property {} not writable", index),
    }
}

/// Absolute slash path of a display object, for `_target`.
pub fn target_path(ctx: &PlayerContext, id: DisplayObjectId) -> String {
    let mut segments = Vec::new();
    let mut current = Some(id);
    while let Some(object_id) = current {
        if object_id == ctx.root {
            break;
        }
        let object = match ctx.display_objects.get(object_id) {
            Some(object) => object,
            None => break,
        };
        segments.push(object.name.clone().unwrap_or_default());
        current = object.parent;
    }
    if segments.is_empty() {
        "/".to_string()
    } else {
        segments.reverse();
        format!("/{}", segments.join("/"))
    }
}

fn push_enumeration(ctx: &PlayerContext, ectx: &mut ExecutionContext, value: &Avm1Value) {
    // null marks the end of the name run
    ectx.push(Avm1Value::Null);
    match value {
        Avm1Value::Object(id) => {
            if let Some(object) = ctx.objects.get(*id) {
                for key in object.keys() {
                    ectx.push(Avm1Value::Str(key));
                }
            }
        }
        Avm1Value::Clip(id) => {
            if let Some(object) = ctx.display_objects.get(*id) {
                for key in object.variables.keys() {
                    ectx.push(Avm1Value::Str(key.clone()));
                }
            }
        }
        _ => {}
    }
}

fn define_function(ctx: &mut PlayerContext, ectx: &mut ExecutionContext, decl: &FunctionDecl) {
    let function = Avm1Function::from_decl(decl, ectx.target, Arc::clone(&ectx.constant_pool));
    let id = ctx.functions.alloc(function);
    if decl.name.is_empty() {
        ectx.push(Avm1Value::Function(id));
    } else {
        let target = ectx.target;
        let case_sensitive = ctx.case_sensitive();
        if let Some(object) = ctx.display_objects.get_mut(target) {
            map_set(
                &mut object.variables,
                &decl.name,
                Avm1Value::Function(id),
                case_sensitive,
            );
        }
    }
}

fn call_method(
    ctx: &mut PlayerContext,
    ectx: &mut ExecutionContext,
    object: &Avm1Value,
    name: &str,
    args: Vec<Avm1Value>,
) -> Result<Avm1Value, ScriptError> {
    if name.is_empty() || name == "undefined" {
        // the "method" slot holds the function itself
        if let Avm1Value::Function(fid) = object {
            return call_function(
                ctx,
                *fid,
                Avm1Value::Clip(ectx.target),
                args,
                ectx.call_depth + 1,
            );
        }
        warn!("Call of non-function value");
        return Ok(Avm1Value::Undefined);
    }
    if let Avm1Value::Clip(clip) = object {
        if let Some(result) = call_clip_builtin(ctx, *clip, name, &args)? {
            return Ok(result);
        }
    }
    match get_member(ctx, object, name) {
        Avm1Value::Function(fid) => {
            call_function(ctx, fid, object.clone(), args, ectx.call_depth + 1)
        }
        _ => {
            warn!("Call of undefined method '{}'", name);
            Ok(Avm1Value::Undefined)
        }
    }
}

/// The timeline methods every clip answers natively.
fn call_clip_builtin(
    ctx: &mut PlayerContext,
    clip: DisplayObjectId,
    name: &str,
    args: &[Avm1Value],
) -> Result<Option<Avm1Value>, ScriptError> {
    let case_sensitive = false; // builtin method names never were
    let arg0 = args.get(0).cloned().unwrap_or(Avm1Value::Undefined);
    if name_eq(name, "play", case_sensitive) {
        set_stopped(ctx, clip, false);
    } else if name_eq(name, "stop", case_sensitive) {
        set_stopped(ctx, clip, true);
    } else if name_eq(name, "gotoAndPlay", case_sensitive) {
        let dest = resolve_frame_target(ctx, clip, &arg0, None);
        goto_frame(ctx, clip, dest, true);
    } else if name_eq(name, "gotoAndStop", case_sensitive) {
        let dest = resolve_frame_target(ctx, clip, &arg0, None);
        goto_frame(ctx, clip, dest, false);
    } else if name_eq(name, "nextFrame", case_sensitive) {
        let fp = current_frame(ctx, clip);
        goto_frame(ctx, clip, fp + 1, false);
    } else if name_eq(name, "prevFrame", case_sensitive) {
        let fp = current_frame(ctx, clip);
        goto_frame(ctx, clip, fp.saturating_sub(1), false);
    } else {
        return Ok(None);
    }
    Ok(Some(Avm1Value::Undefined))
}

pub fn call_function(
    ctx: &mut PlayerContext,
    fid: FunctionId,
    this: Avm1Value,
    args: Vec<Avm1Value>,
    depth: u32,
) -> Result<Avm1Value, ScriptError> {
    if depth > MAX_RECURSION {
        return Err(ScriptError::new("Recursion limit reached"));
    }
    let (body, params, register_count, flags, clip, pool, name) = match ctx.functions.get(fid)
    {
        Some(function) => (
            Arc::clone(&function.body),
            function.params.clone(),
            function.register_count,
            function.flags,
            function.clip,
            Arc::clone(&function.constant_pool),
            function.name.clone(),
        ),
        None => {
            warn!("Call through dead function handle");
            return Ok(Avm1Value::Undefined);
        }
    };
    debug!("Calling function '{}' with {} args", name, args.len());

    let mut ectx = ExecutionContext::new(clip);
    ectx.constant_pool = pool;
    ectx.call_depth = depth;

    let arguments_id = {
        let mut array = ScriptObject::new_array(args.len());
        for (index, arg) in args.iter().enumerate() {
            array.set(&index.to_string(), arg.clone(), true);
        }
        ctx.objects.alloc(array)
    };

    // modern declarations preload a fixed roster into low registers
    let mut next_register: u8 = 1;
    if flags & function_flags::PRELOAD_THIS != 0 {
        ectx.set_register(next_register, this.clone());
        next_register += 1;
    }
    if flags & function_flags::PRELOAD_ARGUMENTS != 0 {
        ectx.set_register(next_register, Avm1Value::Object(arguments_id));
        next_register += 1;
    }
    if flags & function_flags::PRELOAD_SUPER != 0 {
        ectx.set_register(next_register, Avm1Value::Undefined);
        next_register += 1;
    }
    if flags & function_flags::PRELOAD_ROOT != 0 {
        ectx.set_register(next_register, Avm1Value::Clip(ctx.root));
        next_register += 1;
    }
    if flags & function_flags::PRELOAD_PARENT != 0 {
        let parent = ctx
            .display_objects
            .get(clip)
            .and_then(|obj| obj.parent)
            .map(Avm1Value::Clip)
            .unwrap_or(Avm1Value::Undefined);
        ectx.set_register(next_register, parent);
        next_register += 1;
    }
    if flags & function_flags::PRELOAD_GLOBAL != 0 {
        // no global object surface; the slot still has to be claimed
        ectx.set_register(next_register, Avm1Value::Undefined);
    }

    if flags & function_flags::SUPPRESS_THIS == 0 {
        ectx.locals.insert("this".to_string(), this);
    }
    if flags & function_flags::SUPPRESS_ARGUMENTS == 0 {
        ectx.locals
            .insert("arguments".to_string(), Avm1Value::Object(arguments_id));
    }
    for (index, (register, param)) in params.iter().enumerate() {
        let value = args.get(index).cloned().unwrap_or(Avm1Value::Undefined);
        if *register > 0 && register_count > 0 {
            ectx.set_register(*register, value);
        } else {
            ectx.locals.insert(param.clone(), value);
        }
    }

    let result = execute(ctx, &body, &mut ectx)?;
    Ok(result.unwrap_or(Avm1Value::Undefined))
}

fn construct_by_name(
    ctx: &mut PlayerContext,
    ectx: &mut ExecutionContext,
    name: &str,
    args: Vec<Avm1Value>,
) -> Result<Avm1Value, ScriptError> {
    if name_eq(name, "Object", false) {
        let id = ctx.objects.alloc(ScriptObject::new());
        return Ok(Avm1Value::Object(id));
    }
    if name_eq(name, "Array", false) {
        let length = match args.get(0) {
            Some(Avm1Value::Int(n)) if args.len() == 1 => *n.max(&0) as usize,
            _ => 0,
        };
        let mut array = ScriptObject::new_array(length);
        if args.len() > 1 {
            for (index, arg) in args.iter().enumerate() {
                array.set(&index.to_string(), arg.clone(), true);
            }
            array.set("length", Avm1Value::Int(args.len() as i32), true);
        }
        let id = ctx.objects.alloc(array);
        return Ok(Avm1Value::Object(id));
    }
    let ctor = get_variable(ctx, ectx, name);
    construct(ctx, &ctor, args, ectx.call_depth + 1)
}

fn construct(
    ctx: &mut PlayerContext,
    ctor: &Avm1Value,
    args: Vec<Avm1Value>,
    depth: u32,
) -> Result<Avm1Value, ScriptError> {
    match ctor {
        Avm1Value::Function(fid) => {
            let id = ctx.objects.alloc(ScriptObject::new());
            call_function(ctx, *fid, Avm1Value::Object(id), args, depth)?;
            Ok(Avm1Value::Object(id))
        }
        _ => {
            warn!("Construction from non-function value");
            Ok(Avm1Value::Undefined)
        }
    }
}

fn set_stopped(ctx: &mut PlayerContext, clip: DisplayObjectId, stopped: bool) {
    if let Some(clip) = ctx.get_clip_mut(clip) {
        clip.state.stopped = stopped;
    }
}

fn is_playing(ctx: &PlayerContext, clip: DisplayObjectId) -> bool {
    ctx.get_clip(clip)
        .map(|clip| !clip.state.stopped)
        .unwrap_or(false)
}

fn current_frame(ctx: &PlayerContext, clip: DisplayObjectId) -> u32 {
    ctx.get_clip(clip).map(|clip| clip.state.fp).unwrap_or(0)
}

fn frames_loaded(ctx: &PlayerContext, clip: DisplayObjectId) -> usize {
    ctx.get_clip(clip)
        .map(|clip| clip.frames_loaded())
        .unwrap_or(0)
}
