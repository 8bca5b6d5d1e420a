//! Script and opcode model.
//!
//! A [`Script`] is an immutable list of [`Opcode`]s. Opcodes are a closed
//! set: constant ops with no payload, push-data ops, and the DeFi protocol
//! extension (`OP_RETURN` followed by a `DfTx` push). Scripts are built and
//! serialized here, never executed.

use std::fmt;

use crate::composer::{write_var_bytes, Decode, Encode, Reader};
use crate::dftx::{DfTx, DFTX_SIGNATURE};
use crate::error::DfiError;

macro_rules! constant_ops {
    ($($variant:ident = $byte:expr, $name:expr;)*) => {
        /// Constant opcodes, carrying no payload.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Op {
            $($variant = $byte,)*
        }

        impl Op {
            /// Map a wire byte to a constant opcode. Push-data bytes
            /// (`0x01..=0x4e`) are not constants and return `None`.
            pub fn from_byte(byte: u8) -> Option<Op> {
                match byte {
                    $($byte => Some(Op::$variant),)*
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Op::$variant => $name,)*
                }
            }
        }
    };
}

constant_ops! {
    Op0 = 0x00, "OP_0";
    Op1Negate = 0x4f, "OP_1NEGATE";
    Reserved = 0x50, "OP_RESERVED";
    Op1 = 0x51, "OP_1";
    Op2 = 0x52, "OP_2";
    Op3 = 0x53, "OP_3";
    Op4 = 0x54, "OP_4";
    Op5 = 0x55, "OP_5";
    Op6 = 0x56, "OP_6";
    Op7 = 0x57, "OP_7";
    Op8 = 0x58, "OP_8";
    Op9 = 0x59, "OP_9";
    Op10 = 0x5a, "OP_10";
    Op11 = 0x5b, "OP_11";
    Op12 = 0x5c, "OP_12";
    Op13 = 0x5d, "OP_13";
    Op14 = 0x5e, "OP_14";
    Op15 = 0x5f, "OP_15";
    Op16 = 0x60, "OP_16";
    Nop = 0x61, "OP_NOP";
    Ver = 0x62, "OP_VER";
    If = 0x63, "OP_IF";
    NotIf = 0x64, "OP_NOTIF";
    VerIf = 0x65, "OP_VERIF";
    VerNotIf = 0x66, "OP_VERNOTIF";
    Else = 0x67, "OP_ELSE";
    EndIf = 0x68, "OP_ENDIF";
    Verify = 0x69, "OP_VERIFY";
    Return = 0x6a, "OP_RETURN";
    ToAltStack = 0x6b, "OP_TOALTSTACK";
    FromAltStack = 0x6c, "OP_FROMALTSTACK";
    Drop2 = 0x6d, "OP_2DROP";
    Dup2 = 0x6e, "OP_2DUP";
    Dup3 = 0x6f, "OP_3DUP";
    Over2 = 0x70, "OP_2OVER";
    Rot2 = 0x71, "OP_2ROT";
    Swap2 = 0x72, "OP_2SWAP";
    IfDup = 0x73, "OP_IFDUP";
    Depth = 0x74, "OP_DEPTH";
    Drop = 0x75, "OP_DROP";
    Dup = 0x76, "OP_DUP";
    Nip = 0x77, "OP_NIP";
    Over = 0x78, "OP_OVER";
    Pick = 0x79, "OP_PICK";
    Roll = 0x7a, "OP_ROLL";
    Rot = 0x7b, "OP_ROT";
    Swap = 0x7c, "OP_SWAP";
    Tuck = 0x7d, "OP_TUCK";
    Cat = 0x7e, "OP_CAT";
    Substr = 0x7f, "OP_SUBSTR";
    Left = 0x80, "OP_LEFT";
    Right = 0x81, "OP_RIGHT";
    Size = 0x82, "OP_SIZE";
    Invert = 0x83, "OP_INVERT";
    And = 0x84, "OP_AND";
    Or = 0x85, "OP_OR";
    Xor = 0x86, "OP_XOR";
    Equal = 0x87, "OP_EQUAL";
    EqualVerify = 0x88, "OP_EQUALVERIFY";
    Reserved1 = 0x89, "OP_RESERVED1";
    Reserved2 = 0x8a, "OP_RESERVED2";
    Add1 = 0x8b, "OP_1ADD";
    Sub1 = 0x8c, "OP_1SUB";
    Mul2 = 0x8d, "OP_2MUL";
    Div2 = 0x8e, "OP_2DIV";
    Negate = 0x8f, "OP_NEGATE";
    Abs = 0x90, "OP_ABS";
    Not = 0x91, "OP_NOT";
    NotEqual0 = 0x92, "OP_0NOTEQUAL";
    Add = 0x93, "OP_ADD";
    Sub = 0x94, "OP_SUB";
    Mul = 0x95, "OP_MUL";
    Div = 0x96, "OP_DIV";
    Mod = 0x97, "OP_MOD";
    LShift = 0x98, "OP_LSHIFT";
    RShift = 0x99, "OP_RSHIFT";
    BoolAnd = 0x9a, "OP_BOOLAND";
    BoolOr = 0x9b, "OP_BOOLOR";
    NumEqual = 0x9c, "OP_NUMEQUAL";
    NumEqualVerify = 0x9d, "OP_NUMEQUALVERIFY";
    NumNotEqual = 0x9e, "OP_NUMNOTEQUAL";
    LessThan = 0x9f, "OP_LESSTHAN";
    GreaterThan = 0xa0, "OP_GREATERTHAN";
    LessThanOrEqual = 0xa1, "OP_LESSTHANOREQUAL";
    GreaterThanOrEqual = 0xa2, "OP_GREATERTHANOREQUAL";
    Min = 0xa3, "OP_MIN";
    Max = 0xa4, "OP_MAX";
    Within = 0xa5, "OP_WITHIN";
    Ripemd160 = 0xa6, "OP_RIPEMD160";
    Sha1 = 0xa7, "OP_SHA1";
    Sha256 = 0xa8, "OP_SHA256";
    Hash160 = 0xa9, "OP_HASH160";
    Hash256 = 0xaa, "OP_HASH256";
    CodeSeparator = 0xab, "OP_CODESEPARATOR";
    CheckSig = 0xac, "OP_CHECKSIG";
    CheckSigVerify = 0xad, "OP_CHECKSIGVERIFY";
    CheckMultiSig = 0xae, "OP_CHECKMULTISIG";
    CheckMultiSigVerify = 0xaf, "OP_CHECKMULTISIGVERIFY";
    Nop1 = 0xb0, "OP_NOP1";
    CheckLockTimeVerify = 0xb1, "OP_CHECKLOCKTIMEVERIFY";
    CheckSequenceVerify = 0xb2, "OP_CHECKSEQUENCEVERIFY";
    Nop4 = 0xb3, "OP_NOP4";
    Nop5 = 0xb4, "OP_NOP5";
    Nop6 = 0xb5, "OP_NOP6";
    Nop7 = 0xb6, "OP_NOP7";
    Nop8 = 0xb7, "OP_NOP8";
    Nop9 = 0xb8, "OP_NOP9";
    Nop10 = 0xb9, "OP_NOP10";
    InvalidOpcode = 0xff, "OP_INVALIDOPCODE";
}

const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;

impl Op {
    /// `OP_0`..`OP_16` for `n` in `0..=16`.
    pub fn small_int(n: u8) -> Option<Op> {
        match n {
            0 => Some(Op::Op0),
            1..=16 => Op::from_byte(0x50 + n),
            _ => None,
        }
    }

    pub fn byte(self) -> u8 {
        self as u8
    }
}

/// Byte order a push-data payload was supplied in.
///
/// Payloads are stored in wire order ("little"). A big-endian source, such
/// as a displayed hash, is reversed on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// A data push, stored in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PushData {
    data: Vec<u8>,
}

impl PushData {
    pub fn new(bytes: impl Into<Vec<u8>>, endian: Endian) -> Self {
        let mut data = bytes.into();
        if endian == Endian::Big {
            data.reverse();
        }
        Self { data }
    }

    /// Payload in wire order.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Payload with the byte order reversed, e.g. for display.
    pub fn to_big_endian(&self) -> Vec<u8> {
        self.data.iter().rev().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        let len = self.data.len();
        if len < OP_PUSHDATA1 as usize {
            buf.push(len as u8);
        } else if len <= 0xff {
            buf.push(OP_PUSHDATA1);
            buf.push(len as u8);
        } else if len <= 0xffff {
            buf.push(OP_PUSHDATA2);
            buf.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            buf.push(OP_PUSHDATA4);
            buf.extend_from_slice(&(len as u32).to_le_bytes());
        }
        buf.extend_from_slice(&self.data);
    }

    /// Decode the payload after the leading push byte `code` was read.
    fn decode_after(code: u8, reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        let len = match code {
            0x01..=0x4b => code as usize,
            OP_PUSHDATA1 => {
                let len = reader.read_u8()? as usize;
                if len < OP_PUSHDATA1 as usize {
                    return Err(non_minimal_push(code, len));
                }
                len
            }
            OP_PUSHDATA2 => {
                let len = reader.read_u16_le()? as usize;
                if len <= 0xff {
                    return Err(non_minimal_push(code, len));
                }
                len
            }
            OP_PUSHDATA4 => {
                let len = reader.read_u32_le()? as usize;
                if len <= 0xffff {
                    return Err(non_minimal_push(code, len));
                }
                len
            }
            other => {
                return Err(DfiError::Format(format!(
                    "0x{other:02x} is not a push-data opcode"
                )))
            }
        };
        Ok(Self {
            data: reader.read_bytes(len)?.to_vec(),
        })
    }
}

fn non_minimal_push(code: u8, len: usize) -> DfiError {
    DfiError::Format(format!(
        "non-minimal push: opcode 0x{code:02x} used for {len} bytes"
    ))
}

/// One element of a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opcode {
    Op(Op),
    PushData(PushData),
    /// `OP_RETURN` carrying a DeFi custom transaction.
    DefiTx(DfTx),
}

impl Opcode {
    pub fn push(bytes: impl Into<Vec<u8>>) -> Self {
        Opcode::PushData(PushData::new(bytes, Endian::Little))
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Opcode::Op(op) => buf.push(op.byte()),
            Opcode::PushData(push) => push.encode(buf),
            Opcode::DefiTx(tx) => {
                buf.push(Op::Return.byte());
                PushData::new(tx.to_payload(), Endian::Little).encode(buf);
            }
        }
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        let code = reader.read_u8()?;
        match code {
            0x01..=OP_PUSHDATA4 => Ok(Opcode::PushData(PushData::decode_after(code, reader)?)),
            0x6a => {
                if let Some(tx) = Self::try_decode_dftx(reader)? {
                    return Ok(Opcode::DefiTx(tx));
                }
                Ok(Opcode::Op(Op::Return))
            }
            _ => Op::from_byte(code)
                .map(Opcode::Op)
                .ok_or_else(|| DfiError::Format(format!("unknown opcode 0x{code:02x}"))),
        }
    }

    /// After `OP_RETURN`, consume a following `DfTx` push if there is one.
    /// Anything else is left in place for the next opcode.
    fn try_decode_dftx(reader: &mut Reader<'_>) -> Result<Option<DfTx>, DfiError> {
        let mut lookahead = reader.clone();
        let code = match lookahead.read_u8() {
            Ok(code @ 0x01..=OP_PUSHDATA4) => code,
            _ => return Ok(None),
        };
        let push = match PushData::decode_after(code, &mut lookahead) {
            Ok(push) => push,
            Err(_) => return Ok(None),
        };
        if !push.as_bytes().starts_with(&DFTX_SIGNATURE) {
            return Ok(None);
        }
        let tx = DfTx::from_payload(push.as_bytes())?;
        *reader = lookahead;
        Ok(Some(tx))
    }
}

impl From<Op> for Opcode {
    fn from(op: Op) -> Self {
        Opcode::Op(op)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Op(op) => f.write_str(op.name()),
            Opcode::PushData(push) => write!(f, "{}", hex::encode(push.as_bytes())),
            Opcode::DefiTx(tx) => write!(f, "OP_RETURN OP_DEFI_TX_{}", tx.name()),
        }
    }
}

/// An immutable, ordered sequence of opcodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Script {
    stack: Vec<Opcode>,
}

impl Script {
    pub fn new(stack: Vec<Opcode>) -> Self {
        Self { stack }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
    pub fn p2pkh(pubkey_hash: &[u8; 20]) -> Self {
        Self::new(vec![
            Op::Dup.into(),
            Op::Hash160.into(),
            Opcode::push(pubkey_hash.to_vec()),
            Op::EqualVerify.into(),
            Op::CheckSig.into(),
        ])
    }

    /// `OP_HASH160 <hash> OP_EQUAL`
    pub fn p2sh(script_hash: &[u8; 20]) -> Self {
        Self::new(vec![
            Op::Hash160.into(),
            Opcode::push(script_hash.to_vec()),
            Op::Equal.into(),
        ])
    }

    /// `OP_0 <20-byte hash>`
    pub fn p2wpkh(pubkey_hash: &[u8; 20]) -> Self {
        Self::new(vec![Op::Op0.into(), Opcode::push(pubkey_hash.to_vec())])
    }

    /// `OP_0 <32-byte hash>`
    pub fn p2wsh(script_hash: &[u8; 32]) -> Self {
        Self::new(vec![Op::Op0.into(), Opcode::push(script_hash.to_vec())])
    }

    /// `OP_RETURN` carrying a custom transaction.
    pub fn defi_tx(tx: DfTx) -> Self {
        Self::new(vec![Opcode::DefiTx(tx)])
    }

    pub fn ops(&self) -> &[Opcode] {
        &self.stack
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Serialized opcodes without the varint length prefix.
    pub fn to_raw(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for op in &self.stack {
            op.encode(&mut buf);
        }
        buf
    }

    /// Parse raw script bytes (no length prefix).
    pub fn from_raw(bytes: &[u8]) -> Result<Self, DfiError> {
        let mut reader = Reader::new(bytes);
        let mut stack = Vec::new();
        while !reader.is_empty() {
            stack.push(Opcode::decode(&mut reader)?);
        }
        Ok(Self { stack })
    }

    pub fn from_raw_hex(hex_str: &str) -> Result<Self, DfiError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| DfiError::Format(format!("invalid script hex: {e}")))?;
        Self::from_raw(&bytes)
    }

    pub fn to_raw_hex(&self) -> String {
        hex::encode(self.to_raw())
    }

    pub fn as_p2pkh(&self) -> Option<[u8; 20]> {
        match self.stack.as_slice() {
            [Opcode::Op(Op::Dup), Opcode::Op(Op::Hash160), Opcode::PushData(hash), Opcode::Op(Op::EqualVerify), Opcode::Op(Op::CheckSig)] => {
                hash.as_bytes().try_into().ok()
            }
            _ => None,
        }
    }

    pub fn as_p2sh(&self) -> Option<[u8; 20]> {
        match self.stack.as_slice() {
            [Opcode::Op(Op::Hash160), Opcode::PushData(hash), Opcode::Op(Op::Equal)] => {
                hash.as_bytes().try_into().ok()
            }
            _ => None,
        }
    }

    pub fn as_p2wpkh(&self) -> Option<[u8; 20]> {
        match self.stack.as_slice() {
            [Opcode::Op(Op::Op0), Opcode::PushData(hash)] => hash.as_bytes().try_into().ok(),
            _ => None,
        }
    }

    pub fn as_p2wsh(&self) -> Option<[u8; 32]> {
        match self.stack.as_slice() {
            [Opcode::Op(Op::Op0), Opcode::PushData(hash)] => hash.as_bytes().try_into().ok(),
            _ => None,
        }
    }

    /// The custom transaction carried by this script, if any.
    pub fn as_defi_tx(&self) -> Option<&DfTx> {
        self.stack.iter().find_map(|op| match op {
            Opcode::DefiTx(tx) => Some(tx),
            _ => None,
        })
    }
}

impl Encode for Script {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_var_bytes(buf, &self.to_raw());
    }
}

impl Decode for Script {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError> {
        Script::from_raw(reader.read_var_bytes()?)
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.stack.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{op}")?;
        }
        Ok(())
    }
}
