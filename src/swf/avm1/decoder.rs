use binary_reader::{BinaryReader, Endian};
use log::warn;
use num_traits::FromPrimitive;
use std::sync::Arc;

use crate::io::SwfRead;
use crate::swf::avm1::action::{Action, ActionRecord, FunctionDecl, PushValue};
use crate::swf::avm1::opcode::OpCode;

/// Decodes an action sequence until its end marker.
///
/// An unknown opcode or a truncated record stops decoding and keeps the
/// records seen so far; the caller runs a shortened script rather than
/// failing the whole frame.
pub fn decode_actions(data: &[u8]) -> Vec<ActionRecord> {
    let mut out = Vec::new();
    let mut pos = 0usize;

    while pos < data.len() {
        let opcode = data[pos];
        if opcode == 0 {
            break;
        }

        if !OpCode::has_payload(opcode) {
            match OpCode::from_u8(opcode).and_then(simple_action) {
                Some(action) => {
                    out.push(ActionRecord {
                        action,
                        encoded_len: 1,
                    });
                    pos += 1;
                }
                None => {
                    warn!("Unknown action opcode 0x{:02x}, stopping decode", opcode);
                    break;
                }
            }
            continue;
        }

        if pos + 3 > data.len() {
            warn!("Truncated action header at offset {}", pos);
            break;
        }
        let payload_len = u16::from_le_bytes([data[pos + 1], data[pos + 2]]) as usize;
        let payload_start = pos + 3;
        let payload_end = payload_start + payload_len;
        if payload_end > data.len() {
            warn!(
                "Action payload runs past end of stream at offset {} (len {})",
                pos, payload_len
            );
            break;
        }
        let payload = &data[payload_start..payload_end];

        match decode_payload_action(opcode, payload, &data[payload_end..]) {
            Ok(Some((action, body_len))) => {
                out.push(ActionRecord {
                    action,
                    encoded_len: 3 + payload_len + body_len,
                });
                pos = payload_end + body_len;
            }
            Ok(None) => {
                warn!("Unknown action opcode 0x{:02x}, stopping decode", opcode);
                break;
            }
            Err(e) => {
                warn!("Bad action record 0x{:02x} at offset {}: {}", opcode, pos, e);
                break;
            }
        }
    }

    out
}

fn simple_action(opcode: OpCode) -> Option<Action> {
    let action = match opcode {
        OpCode::NextFrame => Action::NextFrame,
        OpCode::PreviousFrame => Action::PreviousFrame,
        OpCode::Play => Action::Play,
        OpCode::Stop => Action::Stop,
        OpCode::ToggleQuality => Action::ToggleQuality,
        OpCode::StopSounds => Action::StopSounds,
        OpCode::Add => Action::Add,
        OpCode::Subtract => Action::Subtract,
        OpCode::Multiply => Action::Multiply,
        OpCode::Divide => Action::Divide,
        OpCode::Equals => Action::Equals,
        OpCode::Less => Action::Less,
        OpCode::And => Action::And,
        OpCode::Or => Action::Or,
        OpCode::Not => Action::Not,
        OpCode::StringEquals => Action::StringEquals,
        OpCode::StringLength => Action::StringLength,
        OpCode::StringExtract => Action::StringExtract,
        OpCode::Pop => Action::Pop,
        OpCode::ToInteger => Action::ToInteger,
        OpCode::GetVariable => Action::GetVariable,
        OpCode::SetVariable => Action::SetVariable,
        OpCode::SetTarget2 => Action::SetTarget2,
        OpCode::StringAdd => Action::StringAdd,
        OpCode::GetProperty => Action::GetProperty,
        OpCode::SetProperty => Action::SetProperty,
        OpCode::CloneSprite => Action::CloneSprite,
        OpCode::RemoveSprite => Action::RemoveSprite,
        OpCode::Trace => Action::Trace,
        OpCode::StartDrag => Action::StartDrag,
        OpCode::EndDrag => Action::EndDrag,
        OpCode::StringLess => Action::StringLess,
        OpCode::CastOp => Action::CastOp,
        OpCode::ImplementsOp => Action::ImplementsOp,
        OpCode::RandomNumber => Action::RandomNumber,
        OpCode::MbStringLength => Action::MbStringLength,
        OpCode::CharToAscii => Action::CharToAscii,
        OpCode::AsciiToChar => Action::AsciiToChar,
        OpCode::GetTime => Action::GetTime,
        OpCode::MbStringExtract => Action::MbStringExtract,
        OpCode::MbCharToAscii => Action::MbCharToAscii,
        OpCode::MbAsciiToChar => Action::MbAsciiToChar,
        OpCode::Delete => Action::Delete,
        OpCode::Delete2 => Action::Delete2,
        OpCode::DefineLocal => Action::DefineLocal,
        OpCode::CallFunction => Action::CallFunction,
        OpCode::Return => Action::Return,
        OpCode::Modulo => Action::Modulo,
        OpCode::NewObject => Action::NewObject,
        OpCode::DefineLocal2 => Action::DefineLocal2,
        OpCode::InitArray => Action::InitArray,
        OpCode::InitObject => Action::InitObject,
        OpCode::TypeOf => Action::TypeOf,
        OpCode::TargetPath => Action::TargetPath,
        OpCode::Enumerate => Action::Enumerate,
        OpCode::Add2 => Action::Add2,
        OpCode::Less2 => Action::Less2,
        OpCode::Equals2 => Action::Equals2,
        OpCode::ToNumber => Action::ToNumber,
        OpCode::ToString => Action::ToString,
        OpCode::PushDuplicate => Action::PushDuplicate,
        OpCode::StackSwap => Action::StackSwap,
        OpCode::GetMember => Action::GetMember,
        OpCode::SetMember => Action::SetMember,
        OpCode::Increment => Action::Increment,
        OpCode::Decrement => Action::Decrement,
        OpCode::CallMethod => Action::CallMethod,
        OpCode::NewMethod => Action::NewMethod,
        OpCode::InstanceOf => Action::InstanceOf,
        OpCode::Enumerate2 => Action::Enumerate2,
        OpCode::BitAnd => Action::BitAnd,
        OpCode::BitOr => Action::BitOr,
        OpCode::BitXor => Action::BitXor,
        OpCode::BitLShift => Action::BitLShift,
        OpCode::BitRShift => Action::BitRShift,
        OpCode::BitURShift => Action::BitURShift,
        OpCode::StrictEquals => Action::StrictEquals,
        OpCode::Greater => Action::Greater,
        OpCode::StringGreater => Action::StringGreater,
        OpCode::Extends => Action::Extends,
        _ => return None,
    };
    Some(action)
}

/// Decodes a long-form record. `rest` is the stream after the payload;
/// function declarations pull their body from it. Returns the action and
/// how many bytes of `rest` the body used, or `None` for an unknown
/// opcode.
fn decode_payload_action(
    opcode: u8,
    payload: &[u8],
    rest: &[u8],
) -> Result<Option<(Action, usize)>, String> {
    let opcode = match OpCode::from_u8(opcode) {
        Some(op) => op,
        None => return Ok(None),
    };
    let mut r = BinaryReader::from_u8(payload);
    r.set_endian(Endian::Little);

    let result = match opcode {
        OpCode::GotoFrame => {
            let frame = read_u16(&mut r)?;
            (Action::GotoFrame(frame), 0)
        }
        OpCode::GetUrl => {
            let url = r.read_string_z()?;
            let target = r.read_string_z()?;
            (Action::GetUrl { url, target }, 0)
        }
        OpCode::StoreRegister => {
            let reg = read_u8(&mut r)?;
            (Action::StoreRegister(reg), 0)
        }
        OpCode::ConstantPool => {
            let count = read_u16(&mut r)?;
            let mut pool = Vec::with_capacity(count as usize);
            for _ in 0..count {
                pool.push(r.read_string_z()?);
            }
            (Action::ConstantPool(pool), 0)
        }
        OpCode::WaitForFrame => {
            let frame = read_u16(&mut r)?;
            let skip_count = read_u8(&mut r)?;
            (Action::WaitForFrame { frame, skip_count }, 0)
        }
        OpCode::SetTarget => {
            let target = r.read_string_z()?;
            (Action::SetTarget(target), 0)
        }
        OpCode::GotoLabel => {
            let label = r.read_string_z()?;
            (Action::GotoLabel(label), 0)
        }
        OpCode::WaitForFrame2 => {
            let skip_count = read_u8(&mut r)?;
            (Action::WaitForFrame2 { skip_count }, 0)
        }
        OpCode::DefineFunction => {
            let name = r.read_string_z()?;
            let num_params = read_u16(&mut r)?;
            let mut params = Vec::with_capacity(num_params as usize);
            for _ in 0..num_params {
                params.push((0u8, r.read_string_z()?));
            }
            let code_size = read_u16(&mut r)? as usize;
            let body = read_body(rest, code_size)?;
            let decl = FunctionDecl {
                name,
                register_count: 0,
                flags: 0,
                params,
                body,
            };
            (Action::DefineFunction(decl), code_size)
        }
        OpCode::DefineFunction2 => {
            let name = r.read_string_z()?;
            let num_params = read_u16(&mut r)?;
            let register_count = read_u8(&mut r)?;
            let flags = read_u16(&mut r)?;
            let mut params = Vec::with_capacity(num_params as usize);
            for _ in 0..num_params {
                let reg = read_u8(&mut r)?;
                params.push((reg, r.read_string_z()?));
            }
            let code_size = read_u16(&mut r)? as usize;
            let body = read_body(rest, code_size)?;
            let decl = FunctionDecl {
                name,
                register_count,
                flags,
                params,
                body,
            };
            (Action::DefineFunction2(decl), code_size)
        }
        OpCode::With => {
            let code_size = read_u16(&mut r)? as usize;
            let body = read_body(rest, code_size)?;
            (Action::With { body }, code_size)
        }
        OpCode::Push => {
            let values = read_push_values(&mut r)?;
            (Action::Push(values), 0)
        }
        OpCode::Jump => {
            let offset = read_u16(&mut r)? as i16;
            (Action::Jump(offset), 0)
        }
        OpCode::GetUrl2 => {
            let flags = read_u8(&mut r)?;
            (Action::GetUrl2 { flags }, 0)
        }
        OpCode::If => {
            let offset = read_u16(&mut r)? as i16;
            (Action::If(offset), 0)
        }
        // long-form encoding with an empty payload
        OpCode::Call => (Action::Call, 0),
        OpCode::GotoFrame2 => {
            let flags = read_u8(&mut r)?;
            let play = flags & 0x01 != 0;
            let scene_bias = if flags & 0x02 != 0 {
                read_u16(&mut r)?
            } else {
                0
            };
            (Action::GotoFrame2 { play, scene_bias }, 0)
        }
        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn read_body(rest: &[u8], code_size: usize) -> Result<Arc<Vec<ActionRecord>>, String> {
    if code_size > rest.len() {
        return Err(format!(
            "Function body of {} bytes exceeds remaining stream ({})",
            code_size,
            rest.len()
        ));
    }
    Ok(Arc::new(decode_actions(&rest[..code_size])))
}

fn read_push_values(r: &mut BinaryReader) -> Result<Vec<PushValue>, String> {
    let mut values = Vec::new();
    while r.pos < r.length {
        let kind = read_u8(r)?;
        let value = match kind {
            0 => PushValue::Str(r.read_string_z()?),
            1 => PushValue::Float(r.read_f32_le()?),
            2 => PushValue::Null,
            3 => PushValue::Undefined,
            4 => PushValue::Register(read_u8(r)?),
            5 => PushValue::Bool(read_u8(r)? != 0),
            6 => PushValue::Double(r.read_f64_swapped()?),
            7 => PushValue::Int(read_u32(r)? as i32),
            8 => PushValue::Const8(read_u8(r)?),
            9 => PushValue::Const16(read_u16(r)?),
            _ => {
                warn!("Unknown push value type {}, truncating push", kind);
                break;
            }
        };
        values.push(value);
    }
    Ok(values)
}

fn read_u8(r: &mut BinaryReader) -> Result<u8, String> {
    r.read_u8().map_err(|e| format!("Failed to read u8: {:?}", e))
}

fn read_u16(r: &mut BinaryReader) -> Result<u16, String> {
    r.read_u16()
        .map_err(|e| format!("Failed to read u16: {:?}", e))
}

fn read_u32(r: &mut BinaryReader) -> Result<u32, String> {
    r.read_u32()
        .map_err(|e| format!("Failed to read u32: {:?}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_stop_sequence() {
        // Stop, End
        let records = decode_actions(&[0x07, 0x00]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, Action::Stop);
        assert_eq!(records[0].encoded_len, 1);
    }

    #[test]
    fn test_decode_push_string_and_trace() {
        // Push "hi", Trace, End
        let data = [0x96, 0x04, 0x00, 0x00, b'h', b'i', 0x00, 0x26, 0x00];
        let records = decode_actions(&data);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].action,
            Action::Push(vec![PushValue::Str("hi".into())])
        );
        assert_eq!(records[0].encoded_len, 7);
        assert_eq!(records[1].action, Action::Trace);
    }

    #[test]
    fn test_decode_push_multiple_values() {
        // One record carrying an int and a bool
        let data = [
            0x96, 0x07, 0x00, // header, len 7
            0x07, 0x2A, 0x00, 0x00, 0x00, // int 42
            0x05, 0x01, // bool true
            0x00,
        ];
        let records = decode_actions(&data);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].action,
            Action::Push(vec![PushValue::Int(42), PushValue::Bool(true)])
        );
    }

    #[test]
    fn test_unknown_opcode_stops_decode() {
        // Play, then an unassigned short opcode, then Stop. The tail is
        // never reached.
        let records = decode_actions(&[0x06, 0x77, 0x07, 0x00]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, Action::Play);
    }

    #[test]
    fn test_truncated_payload_stops_decode() {
        let records = decode_actions(&[0x06, 0x96, 0xFF, 0x00, 0x02]);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_decode_define_function() {
        // function f() { stop(); }
        let data = [
            0x9B, 0x06, 0x00, // DefineFunction, payload len 6
            b'f', 0x00, // name
            0x00, 0x00, // 0 params
            0x02, 0x00, // code size 2
            0x07, 0x00, // body: Stop, End
            0x06, // Play after the function
            0x00,
        ];
        let records = decode_actions(&data);
        assert_eq!(records.len(), 2);
        match &records[0].action {
            Action::DefineFunction(decl) => {
                assert_eq!(decl.name, "f");
                assert_eq!(decl.body.len(), 1);
                assert_eq!(decl.body[0].action, Action::Stop);
            }
            other => panic!("expected DefineFunction, got {:?}", other),
        }
        // header + payload + swallowed body
        assert_eq!(records[0].encoded_len, 3 + 6 + 2);
        assert_eq!(records[1].action, Action::Play);
    }

    #[test]
    fn test_decode_define_function2_params() {
        let data = [
            0x8E, 0x0F, 0x00, // DefineFunction2, payload len 15
            b'g', 0x00, // name
            0x02, 0x00, // 2 params
            0x05, // register count
            0x01, 0x00, // flags: preload this
            0x01, b'a', 0x00, // param a in r1
            0x02, b'b', 0x00, // param b in r2
            0x00, 0x00, // code size 0
            0x00,
        ];
        let records = decode_actions(&data);
        assert_eq!(records.len(), 1);
        match &records[0].action {
            Action::DefineFunction2(decl) => {
                assert_eq!(decl.register_count, 5);
                assert_eq!(decl.params, vec![(1, "a".into()), (2, "b".into())]);
                assert!(decl.body.is_empty());
            }
            other => panic!("expected DefineFunction2, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_goto_frame2() {
        let data = [0x9F, 0x03, 0x00, 0x03, 0x05, 0x00, 0x00];
        let records = decode_actions(&data);
        assert_eq!(
            records[0].action,
            Action::GotoFrame2 {
                play: true,
                scene_bias: 5
            }
        );
    }
}
