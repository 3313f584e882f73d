// interp.rs — the bytecode interpreter
//
// A switched decoder over a fixed opcode set: an operand stack held
// host-side, a call stack threaded through sandboxed VM memory, and a
// syscall escape on negative call targets. No JIT.

use crate::vm::{Syscalls, Vm, MAX_VMSYSCALL_ARGS, OPSTACK_SIZE};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Undef = 0,
    Ignore,
    Break,

    Enter, // v: stack frame size
    Leave, // v: matching frame size
    Call,
    Push,
    Pop,

    Const, // v: literal
    Local, // v: frame-relative address

    Jump,

    Eq, // v: branch target instruction
    Ne,
    Lti,
    Lei,
    Gti,
    Gei,
    Ltu,
    Leu,
    Gtu,
    Geu,
    Eqf,
    Nef,
    Ltf,
    Lef,
    Gtf,
    Gef,

    Load1,
    Load2,
    Load4,
    Store1,
    Store2,
    Store4,
    Arg,       // b: frame offset for the next call's argument
    BlockCopy, // v: byte count

    Sex8,
    Sex16,

    Negi,
    Add,
    Sub,
    Divi,
    Divu,
    Modi,
    Modu,
    Muli,
    Mulu,

    Band,
    Bor,
    Bxor,
    Bcom,

    Lsh,
    Rshi,
    Rshu,

    Negf,
    Addf,
    Subf,
    Divf,
    Mulf,

    Cvif,
    Cvfi,
}

pub const OPCODE_COUNT: u8 = Opcode::Cvfi as u8 + 1;

impl Opcode {
    pub fn from_u8(v: u8) -> Option<Opcode> {
        if v >= OPCODE_COUNT {
            return None;
        }
        // discriminants are contiguous from zero
        Some(unsafe { std::mem::transmute::<u8, Opcode>(v) })
    }

    /// Operand width in the instruction stream.
    pub fn operand_bytes(self) -> usize {
        match self {
            Opcode::Enter
            | Opcode::Leave
            | Opcode::Const
            | Opcode::Local
            | Opcode::BlockCopy
            | Opcode::Eq
            | Opcode::Ne
            | Opcode::Lti
            | Opcode::Lei
            | Opcode::Gti
            | Opcode::Gei
            | Opcode::Ltu
            | Opcode::Leu
            | Opcode::Gtu
            | Opcode::Geu
            | Opcode::Eqf
            | Opcode::Nef
            | Opcode::Ltf
            | Opcode::Lef
            | Opcode::Gtf
            | Opcode::Gef => 4,
            Opcode::Arg => 1,
            _ => 0,
        }
    }
}

/// One decoded instruction.
#[derive(Debug, Clone, Copy)]
pub struct Insn {
    pub op: Opcode,
    pub arg: i32,
}

/// Faults turn the VM terminal: the runtime records `aborted` and every
/// further entry call returns -1.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum VmFault {
    #[error("program counter out of range")]
    BadProgramCounter,
    #[error("undefined opcode")]
    BadOpcode,
    #[error("breakpoint opcode reached")]
    Break,
    #[error("operand stack overflow")]
    OpStackOverflow,
    #[error("operand stack underflow")]
    OpStackUnderflow,
    #[error("program stack overflow")]
    ProgramStackOverflow,
    #[error("integer divide by zero")]
    DivideByZero,
    #[error("jump target out of range")]
    BadJump,
    #[error("abort requested during system call")]
    AbortRequested,
}

impl Vm {
    /// Execute from instruction 0 until the entry frame's sentinel
    /// return. `program_stack` must already hold the entry frame.
    pub(crate) fn run(&mut self, sys: &mut dyn Syscalls) -> Result<i32, VmFault> {
        let mut opstack = [0i32; OPSTACK_SIZE];
        let mut sp: usize = 0;
        let mut pc: i32 = 0;
        let mut program_stack = self.program_stack;

        macro_rules! push {
            ($v:expr) => {{
                if sp >= OPSTACK_SIZE {
                    return Err(VmFault::OpStackOverflow);
                }
                opstack[sp] = $v;
                sp += 1;
            }};
        }
        macro_rules! pop {
            () => {{
                if sp == 0 {
                    return Err(VmFault::OpStackUnderflow);
                }
                sp -= 1;
                opstack[sp]
            }};
        }
        macro_rules! top {
            () => {{
                if sp == 0 {
                    return Err(VmFault::OpStackUnderflow);
                }
                &mut opstack[sp - 1]
            }};
        }
        // binary integer op: r1 OP r0
        macro_rules! binop {
            ($f:expr) => {{
                let r0 = pop!();
                let r1 = pop!();
                #[allow(clippy::redundant_closure_call)]
                push!($f(r1, r0));
            }};
        }
        macro_rules! branch {
            ($target:expr, $cond:expr) => {{
                let r0 = pop!();
                let r1 = pop!();
                #[allow(clippy::redundant_closure_call)]
                if $cond(r1, r0) {
                    if $target < 0 || $target >= self.code.len() as i32 {
                        return Err(VmFault::BadJump);
                    }
                    pc = $target;
                }
            }};
        }
        macro_rules! fbranch {
            ($target:expr, $cond:expr) => {{
                let r0 = f32::from_bits(pop!() as u32);
                let r1 = f32::from_bits(pop!() as u32);
                #[allow(clippy::redundant_closure_call)]
                if $cond(r1, r0) {
                    if $target < 0 || $target >= self.code.len() as i32 {
                        return Err(VmFault::BadJump);
                    }
                    pc = $target;
                }
            }};
        }
        // binary float op over raw bit patterns
        macro_rules! fbinop {
            ($f:expr) => {{
                let r0 = f32::from_bits(pop!() as u32);
                let r1 = f32::from_bits(pop!() as u32);
                #[allow(clippy::redundant_closure_call)]
                let v: f32 = $f(r1, r0);
                push!(v.to_bits() as i32);
            }};
        }

        loop {
            if pc < 0 || pc as usize >= self.code.len() {
                return Err(VmFault::BadProgramCounter);
            }
            let insn = self.code[pc as usize];
            pc += 1;
            let v = insn.arg;

            match insn.op {
                Opcode::Undef => return Err(VmFault::BadOpcode),
                Opcode::Ignore => {}
                Opcode::Break => return Err(VmFault::Break),

                Opcode::Enter => {
                    program_stack -= v;
                    if program_stack < self.stack_bottom {
                        return Err(VmFault::ProgramStackOverflow);
                    }
                }
                Opcode::Leave => {
                    program_stack += v;
                    pc = self.mem.read_i32(program_stack);
                    if pc == -1 {
                        break; // sentinel: the entry frame returned
                    }
                    if pc < 0 || pc as usize >= self.code.len() {
                        return Err(VmFault::BadProgramCounter);
                    }
                }
                Opcode::Call => {
                    let target = pop!();
                    // save the return program counter in the frame
                    self.mem.write_i32(program_stack, pc);
                    if target < 0 {
                        // system call; the selector goes in args[0]
                        let selector = -1 - target;
                        self.mem.write_i32(program_stack + 4, selector);
                        let mut args = [0i32; MAX_VMSYSCALL_ARGS];
                        args[0] = selector;
                        for (i, slot) in args.iter_mut().enumerate().skip(1) {
                            *slot = self.mem.read_i32(program_stack + 4 + 4 * i as i32);
                        }
                        let r = sys.syscall(&mut self.mem, &args);
                        if sys.abort_requested() {
                            return Err(VmFault::AbortRequested);
                        }
                        push!(r);
                        pc = self.mem.read_i32(program_stack);
                        if pc < 0 || pc as usize >= self.code.len() {
                            return Err(VmFault::BadProgramCounter);
                        }
                    } else {
                        if target as usize >= self.code.len() {
                            return Err(VmFault::BadJump);
                        }
                        pc = target;
                    }
                }
                Opcode::Push => push!(0),
                Opcode::Pop => {
                    pop!();
                }

                Opcode::Const => push!(v),
                Opcode::Local => push!(program_stack + v),

                Opcode::Jump => {
                    let target = pop!();
                    if target < 0 || target as usize >= self.code.len() {
                        return Err(VmFault::BadJump);
                    }
                    pc = target;
                }

                Opcode::Eq => branch!(v, |a, b| a == b),
                Opcode::Ne => branch!(v, |a, b| a != b),
                Opcode::Lti => branch!(v, |a: i32, b: i32| a < b),
                Opcode::Lei => branch!(v, |a: i32, b: i32| a <= b),
                Opcode::Gti => branch!(v, |a: i32, b: i32| a > b),
                Opcode::Gei => branch!(v, |a: i32, b: i32| a >= b),
                Opcode::Ltu => branch!(v, |a: i32, b: i32| (a as u32) < (b as u32)),
                Opcode::Leu => branch!(v, |a: i32, b: i32| (a as u32) <= (b as u32)),
                Opcode::Gtu => branch!(v, |a: i32, b: i32| (a as u32) > (b as u32)),
                Opcode::Geu => branch!(v, |a: i32, b: i32| (a as u32) >= (b as u32)),
                Opcode::Eqf => fbranch!(v, |a: f32, b: f32| a == b),
                Opcode::Nef => fbranch!(v, |a: f32, b: f32| a != b),
                Opcode::Ltf => fbranch!(v, |a: f32, b: f32| a < b),
                Opcode::Lef => fbranch!(v, |a: f32, b: f32| a <= b),
                Opcode::Gtf => fbranch!(v, |a: f32, b: f32| a > b),
                Opcode::Gef => fbranch!(v, |a: f32, b: f32| a >= b),

                Opcode::Load1 => {
                    let addr = pop!();
                    push!(self.mem.read_u8(addr) as i32);
                }
                Opcode::Load2 => {
                    let addr = pop!();
                    push!(self.mem.read_u16(addr) as i32);
                }
                Opcode::Load4 => {
                    let addr = pop!();
                    push!(self.mem.read_i32(addr));
                }
                Opcode::Store1 => {
                    let value = pop!();
                    let addr = pop!();
                    self.mem.write_u8(addr, value as u8);
                }
                Opcode::Store2 => {
                    let value = pop!();
                    let addr = pop!();
                    self.mem.write_u16(addr, value as u16);
                }
                Opcode::Store4 => {
                    let value = pop!();
                    let addr = pop!();
                    self.mem.write_i32(addr, value);
                }
                Opcode::Arg => {
                    let value = pop!();
                    self.mem.write_i32(program_stack + v, value);
                }
                Opcode::BlockCopy => {
                    let src = pop!();
                    let dest = pop!();
                    self.mem.block_copy(dest, src, v);
                }

                Opcode::Sex8 => {
                    let t = top!();
                    *t = *t as i8 as i32;
                }
                Opcode::Sex16 => {
                    let t = top!();
                    *t = *t as i16 as i32;
                }

                Opcode::Negi => {
                    let t = top!();
                    *t = t.wrapping_neg();
                }
                Opcode::Add => binop!(|a: i32, b: i32| a.wrapping_add(b)),
                Opcode::Sub => binop!(|a: i32, b: i32| a.wrapping_sub(b)),
                Opcode::Divi => {
                    let r0 = pop!();
                    let r1 = pop!();
                    if r0 == 0 {
                        return Err(VmFault::DivideByZero);
                    }
                    push!(r1.wrapping_div(r0));
                }
                Opcode::Divu => {
                    let r0 = pop!();
                    let r1 = pop!();
                    if r0 == 0 {
                        return Err(VmFault::DivideByZero);
                    }
                    push!(((r1 as u32) / (r0 as u32)) as i32);
                }
                Opcode::Modi => {
                    let r0 = pop!();
                    let r1 = pop!();
                    if r0 == 0 {
                        return Err(VmFault::DivideByZero);
                    }
                    push!(r1.wrapping_rem(r0));
                }
                Opcode::Modu => {
                    let r0 = pop!();
                    let r1 = pop!();
                    if r0 == 0 {
                        return Err(VmFault::DivideByZero);
                    }
                    push!(((r1 as u32) % (r0 as u32)) as i32);
                }
                Opcode::Muli => binop!(|a: i32, b: i32| a.wrapping_mul(b)),
                Opcode::Mulu => {
                    binop!(|a: i32, b: i32| (a as u32).wrapping_mul(b as u32) as i32)
                }

                Opcode::Band => binop!(|a: i32, b: i32| a & b),
                Opcode::Bor => binop!(|a: i32, b: i32| a | b),
                Opcode::Bxor => binop!(|a: i32, b: i32| a ^ b),
                Opcode::Bcom => {
                    let t = top!();
                    *t = !*t;
                }

                Opcode::Lsh => binop!(|a: i32, b: i32| a.wrapping_shl(b as u32)),
                Opcode::Rshi => binop!(|a: i32, b: i32| a.wrapping_shr(b as u32)),
                Opcode::Rshu => {
                    binop!(|a: i32, b: i32| (a as u32).wrapping_shr(b as u32) as i32)
                }

                Opcode::Negf => {
                    let t = top!();
                    *t = (-f32::from_bits(*t as u32)).to_bits() as i32;
                }
                Opcode::Addf => fbinop!(|a: f32, b: f32| a + b),
                Opcode::Subf => fbinop!(|a: f32, b: f32| a - b),
                Opcode::Divf => fbinop!(|a: f32, b: f32| a / b),
                Opcode::Mulf => fbinop!(|a: f32, b: f32| a * b),

                Opcode::Cvif => {
                    let t = top!();
                    *t = (*t as f32).to_bits() as i32;
                }
                Opcode::Cvfi => {
                    let t = top!();
                    *t = f32::from_bits(*t as u32) as i32;
                }
            }
        }

        Ok(if sp > 0 { opstack[sp - 1] } else { 0 })
    }
}
