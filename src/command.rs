use crate::keyspace as sets;
use crate::memory::{self, SlSetRef};
use crate::range::RangeSpec;
use crate::token::Token;
use redis_module::{
    self as rm, raw, Context, NotifyEvent, RedisError, RedisResult, RedisString, RedisValue,
};
use smallvec::SmallVec;
use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_void};

pub type Result<T = RedisValue> = RedisResult<T>;

const REDISMODULE_API_VERSION: c_int = raw::REDISMODULE_APIVER_1 as c_int;

const SYNTAX_ERR: RedisError = RedisError::Str("ERR syntax error");
const RANGE_ERR: RedisError = RedisError::Str("ERR min or max is not valid");

pub(crate) static SLSET_TYPE: rm::native_types::RedisType = rm::native_types::RedisType::new(
    "slsetmod1",
    0,
    raw::RedisModuleTypeMethods {
        version: raw::REDISMODULE_TYPE_METHOD_VERSION as u64,
        rdb_load: Some(slset_rdb_load),
        rdb_save: Some(slset_rdb_save),
        aof_rewrite: None,
        free: Some(memory::slset_free),
        mem_usage: Some(memory::slset_mem_usage),
        digest: None,
        aux_load: None,
        aux_save: None,
        aux_save2: None,
        aux_save_triggers: 0,
        free_effort: None,
        unlink: None,
        copy: None,
        defrag: None,
        copy2: None,
        free_effort2: None,
        mem_usage2: None,
        unlink2: None,
    },
);

// Persistence belongs to the embedding store; the type callbacks are inert.
unsafe extern "C" fn slset_rdb_load(_io: *mut raw::RedisModuleIO, _encver: c_int) -> *mut c_void {
    std::ptr::null_mut()
}

unsafe extern "C" fn slset_rdb_save(_io: *mut raw::RedisModuleIO, _value: *mut c_void) {}

macro_rules! redis_command {
    (
        $ctx:expr,
        $command_name:expr,
        $command_handler:ident,
        $command_flags:expr,
        $firstkey:expr,
        $lastkey:expr,
        $keystep:expr
    ) => {{
        let name = CString::new($command_name).unwrap();
        let flags = CString::new($command_flags).unwrap();

        extern "C" fn __do_command(
            ctx: *mut raw::RedisModuleCtx,
            argv: *mut *mut raw::RedisModuleString,
            argc: c_int,
        ) -> c_int {
            let context = rm::Context::new(ctx);
            let args = rm::decode_args(ctx, argv, argc);
            let response = $command_handler(&context, args);
            context.reply(response) as c_int
        }

        let status = unsafe {
            raw::RedisModule_CreateCommand.unwrap()(
                $ctx,
                name.as_ptr(),
                Some(__do_command),
                flags.as_ptr(),
                $firstkey,
                $lastkey,
                $keystep,
            )
        };
        if status == raw::Status::Err as c_int {
            Err(rm::RedisError::Str("command registration failed"))
        } else {
            Ok(())
        }
    }};
}

/// Errors when the key holds a value that is not ours; passes on a missing
/// key or a key already carrying the module type.
fn verify_type(ctx: &Context, key: &RedisString) -> Result<()> {
    let redis_key = ctx.open_key(key);
    let _ = redis_key.get_value::<SlSetRef>(&SLSET_TYPE)?;
    Ok(())
}

fn pair_reply(out: &mut Vec<RedisValue>, score: &Token, member: &Token) {
    out.push(RedisValue::StringBuffer(score.as_bytes().to_vec()));
    out.push(RedisValue::StringBuffer(member.as_bytes().to_vec()));
}

fn sladd(ctx: &Context, args: Vec<RedisString>) -> Result {
    if args.len() < 4 {
        return Err(RedisError::WrongArity);
    }
    if args.len() % 2 != 0 {
        return Err(SYNTAX_ERR);
    }
    let key = args[1].try_as_str()?;
    verify_type(ctx, &args[1])?;

    let mut pairs: SmallVec<[(Token, Token); 8]> = SmallVec::new();
    for pair in args[2..].chunks_exact(2) {
        pairs.push((
            Token::parse(pair[0].as_slice()),
            Token::parse(pair[1].as_slice()),
        ));
    }

    let added = sets::with_write(Some(ctx), key, move |sl| {
        let mut added = 0i64;
        for (score, member) in pairs {
            if sl.upsert(score, member) {
                added += 1;
            }
        }
        added
    });

    if added != 0 {
        ctx.notify_keyspace_event(NotifyEvent::LIST, "sladd", &args[1]);
    }
    Ok(added.into())
}

fn slrem(ctx: &Context, args: Vec<RedisString>) -> Result {
    if args.len() < 3 {
        return Err(RedisError::WrongArity);
    }
    if args.len() % 2 == 0 {
        return Err(SYNTAX_ERR);
    }
    let key = args[1].try_as_str()?;
    verify_type(ctx, &args[1])?;
    if !sets::contains(key) {
        return Ok(0i64.into());
    }

    let scores: SmallVec<[Token; 8]> = args[2..]
        .iter()
        .map(|arg| Token::parse(arg.as_slice()))
        .collect();

    let (deleted, drained) = sets::with_write(Some(ctx), key, move |sl| {
        let mut deleted = 0i64;
        for score in &scores {
            deleted += sl.delete_score(score) as i64;
            if sl.is_empty() {
                break;
            }
        }
        (deleted, sl.is_empty())
    });

    if deleted != 0 {
        ctx.notify_keyspace_event(NotifyEvent::LIST, "slrem", &args[1]);
        if drained {
            ctx.notify_keyspace_event(NotifyEvent::GENERIC, "del", &args[1]);
        }
    }
    Ok(deleted.into())
}

fn slall(_ctx: &Context, args: Vec<RedisString>) -> Result {
    if args.len() != 2 {
        return Err(RedisError::WrongArity);
    }
    let key = args[1].try_as_str()?;
    let mut out = Vec::new();
    sets::with_read(key, |sl| {
        out.reserve(2 * sl.len());
        for (score, member) in sl.iter() {
            pair_reply(&mut out, score, member);
        }
    });
    Ok(RedisValue::Array(out))
}

fn slrange(ctx: &Context, args: Vec<RedisString>) -> Result {
    if args.len() != 4 {
        return Err(RedisError::WrongArity);
    }
    let key = args[1].try_as_str()?;
    let min = Token::raw(args[2].as_slice());
    let max = Token::raw(args[3].as_slice());
    let range = RangeSpec::parse(&min, &max).map_err(|_| RANGE_ERR)?;
    if !sets::contains(key) {
        // A missing key degrades to an empty reply; a key of another type
        // is still an error.
        verify_type(ctx, &args[1])?;
        return Ok(RedisValue::Array(Vec::new()));
    }
    let mut out = Vec::new();
    sets::with_read(key, |sl| {
        for (score, member) in sl.range(&range) {
            pair_reply(&mut out, score, member);
        }
    });
    Ok(RedisValue::Array(out))
}

fn slsearch(ctx: &Context, args: Vec<RedisString>) -> Result {
    if args.len() != 3 {
        return Err(RedisError::WrongArity);
    }
    let key = args[1].try_as_str()?;
    let score = Token::parse(args[2].as_slice());
    if !sets::contains(key) {
        verify_type(ctx, &args[1])?;
        return Ok(RedisValue::Array(Vec::new()));
    }
    let mut out = Vec::new();
    sets::with_read(key, |sl| {
        for (s, member) in sl.search(&score) {
            pair_reply(&mut out, s, member);
        }
    });
    Ok(RedisValue::Array(out))
}

fn slcard(_ctx: &Context, args: Vec<RedisString>) -> Result {
    if args.len() != 2 {
        return Err(RedisError::WrongArity);
    }
    let key = args[1].try_as_str()?;
    let len = sets::with_read(key, |sl| sl.len() as i64);
    Ok(len.into())
}

/// Register all module commands with the server.
///
/// # Safety
///
/// The `ctx` pointer must be a valid module context provided by Valkey/Redis.
pub unsafe fn register_commands(ctx: *mut raw::RedisModuleCtx) -> rm::Status {
    let result: rm::RedisResult<()> = (|| {
        redis_command!(ctx, "SLADD", sladd, "write fast", 1, 1, 1)?;
        redis_command!(ctx, "SLREM", slrem, "write fast", 1, 1, 1)?;
        redis_command!(ctx, "SLALL", slall, "readonly", 1, 1, 1)?;
        redis_command!(ctx, "SLRANGE", slrange, "readonly", 1, 1, 1)?;
        redis_command!(ctx, "SLSEARCH", slsearch, "readonly", 1, 1, 1)?;
        redis_command!(ctx, "SLCARD", slcard, "readonly", 1, 1, 1)?;
        Ok(())
    })();
    if result.is_err() {
        rm::Status::Err
    } else {
        rm::Status::Ok
    }
}

#[no_mangle]
pub unsafe extern "C" fn slset__on_flush(
    _ctx: *mut raw::RedisModuleCtx,
    _event: raw::RedisModuleEvent,
    _sub: u64,
    _data: *mut c_void,
) {
    sets::clear_all();
}

unsafe extern "C" fn slset_cmd_filter(fctx: *mut raw::RedisModuleCommandFilterCtx) {
    let arg0 = raw::RedisModule_CommandFilterArgGet.unwrap()(fctx, 0);
    if !arg0.is_null() {
        if let Ok(name) = rm::RedisString::from_ptr(arg0) {
            if name.eq_ignore_ascii_case("flushdb") || name.eq_ignore_ascii_case("flushall") {
                sets::clear_all();
            }
        }
    }
}

const REDISMODULE_EVENT_FLUSHDB_VERSION: u64 = 1;

pub unsafe extern "C" fn slset_on_load(
    ctx: *mut raw::RedisModuleCtx,
    _argv: *mut *mut raw::RedisModuleString,
    _argc: c_int,
) -> c_int {
    let module_name = b"slset\0";
    if raw::Export_RedisModule_Init(
        ctx,
        module_name.as_ptr().cast::<c_char>(),
        1,
        REDISMODULE_API_VERSION,
    ) == raw::Status::Err as c_int
    {
        return raw::Status::Err as c_int;
    }
    if SLSET_TYPE.create_data_type(ctx).is_err() {
        return raw::Status::Err as c_int;
    }
    if register_commands(ctx) == rm::Status::Err {
        return raw::Status::Err as c_int;
    }
    if raw::RedisModule_RegisterCommandFilter.unwrap()(ctx, Some(slset_cmd_filter), 0).is_null() {
        return raw::Status::Err as c_int;
    }
    const FLUSH_EVENT: raw::RedisModuleEvent = raw::RedisModuleEvent {
        id: raw::REDISMODULE_EVENT_FLUSHDB,
        dataver: REDISMODULE_EVENT_FLUSHDB_VERSION,
    };
    if raw::RedisModule_SubscribeToServerEvent.unwrap()(ctx, FLUSH_EVENT, Some(slset__on_flush))
        == raw::Status::Err as c_int
    {
        return raw::Status::Err as c_int;
    }
    rm::Context::new(ctx).log_notice("sorted-list module ready");
    raw::Status::Ok as c_int
}

#[no_mangle]
pub unsafe extern "C" fn RedisModule_OnLoad(
    ctx: *mut raw::RedisModuleCtx,
    argv: *mut *mut raw::RedisModuleString,
    argc: c_int,
) -> c_int {
    slset_on_load(ctx, argv, argc)
}

#[no_mangle]
pub unsafe extern "C" fn ValkeyModule_OnLoad(
    ctx: *mut raw::RedisModuleCtx,
    argv: *mut *mut raw::RedisModuleString,
    argc: c_int,
) -> c_int {
    slset_on_load(ctx, argv, argc)
}

#[no_mangle]
pub unsafe extern "C" fn slset_on_unload(_ctx: *mut c_void) {}
