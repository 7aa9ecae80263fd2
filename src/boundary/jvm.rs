/*!
 * JNI Runtime
 * Boundary backend for an Android host reached through the JVM
 *
 * Method IDs and global class references are resolved once in JNI_OnLoad.
 * Every call runs inside its own local frame so permanently attached native
 * threads do not accumulate local references.
 */

use super::manager;
use super::traits::{ExecutionContext, ForeignRuntime, LogSink, ProcessOwner};
use crate::core::config::BridgeConfig;
use crate::core::errors::{BridgeError, BridgeResult};
use crate::core::types::ExitCode;
use jni::objects::{GlobalRef, JClass, JObject, JStaticMethodID, JString, JValue, JValueOwned};
use jni::signature::{Primitive, ReturnType};
use jni::sys::{jint, jsize, jvalue, JNI_ERR, JNI_VERSION_1_6};
use jni::{JNIEnv, JavaVM};
use std::ffi::c_void;
use std::sync::Arc;
use tracing::{debug, error, info};

const LOCAL_FRAME_CAPACITY: i32 = 16;

const EXECUTE: (&str, &str) = ("executeAdbCommand", "([Ljava/lang/String;)I");
const WAIT: (&str, &str) = ("waitProcess", "(I)I");
const READ: (&str, &str) = ("readProcessOutput", "(I)Ljava/lang/String;");
const TERMINATE: (&str, &str) = ("terminateProcess", "(I)Z");
const CLEANUP: (&str, &str) = ("cleanupProcess", "(I)V");
const WRITE_RAW_LOG: (&str, &str) = (
    "writeRawLogJNI",
    "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;)V",
);

impl From<jni::errors::Error> for BridgeError {
    fn from(err: jni::errors::Error) -> Self {
        BridgeError::remote("jni", err)
    }
}

/// Rebuild the thread's `JNIEnv` from its context.
///
/// # Safety
/// `cx` must come from this runtime on the calling thread.
unsafe fn env_from(cx: &ExecutionContext) -> BridgeResult<JNIEnv<'_>> {
    JNIEnv::from_raw(cx.as_raw() as *mut jni::sys::JNIEnv)
        .map_err(|e| BridgeError::unavailable(e.to_string()))
}

/// Print and clear a pending Java exception so the thread stays usable
fn clear_exception(env: &mut JNIEnv<'_>) {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
    }
}

/// Resolve the class and keep a global reference to it
fn resolve_class(env: &mut JNIEnv<'_>, name: &str) -> BridgeResult<GlobalRef> {
    let local = env.find_class(name).map_err(|e| {
        clear_exception(env);
        BridgeError::resolution(name, e)
    })?;
    let global = env.new_global_ref(&local)?;
    env.delete_local_ref(local)?;
    Ok(global)
}

fn resolve_static(
    env: &mut JNIEnv<'_>,
    class: &GlobalRef,
    (name, sig): (&str, &str),
) -> BridgeResult<JStaticMethodID> {
    let class: &JClass = class.as_obj().into();
    env.get_static_method_id(class, name, sig).map_err(|e| {
        clear_exception(env);
        BridgeError::resolution(format!("{}{}", name, sig), e)
    })
}

/// Invoke a static method, converting a thrown exception into `RemoteFault`
fn call_static<'local>(
    env: &mut JNIEnv<'local>,
    class: &GlobalRef,
    method: JStaticMethodID,
    call: &'static str,
    ret: ReturnType,
    args: &[jvalue],
) -> BridgeResult<JValueOwned<'local>> {
    let class: &JClass = class.as_obj().into();
    // SAFETY: method IDs were resolved against this class with matching
    // signatures, and `args` follows those signatures.
    let result = unsafe { env.call_static_method_unchecked(class, method, ret, args) };
    result.map_err(|e| {
        clear_exception(env);
        BridgeError::remote(call, e)
    })
}

/// Static entry points on the host process-owner class
pub struct JniProcessOwner {
    class: GlobalRef,
    execute: JStaticMethodID,
    wait: JStaticMethodID,
    read: JStaticMethodID,
    terminate: JStaticMethodID,
    cleanup: JStaticMethodID,
}

impl ProcessOwner for JniProcessOwner {
    fn execute(&self, cx: &ExecutionContext, args: &[String]) -> BridgeResult<i32> {
        let mut env = unsafe { env_from(cx) }?;
        env.with_local_frame(LOCAL_FRAME_CAPACITY, |env| -> BridgeResult<i32> {
            let array = env.new_object_array(args.len() as jsize, "java/lang/String", JObject::null())?;
            for (i, arg) in args.iter().enumerate() {
                let value = env.new_string(arg)?;
                env.set_object_array_element(&array, i as jsize, &value)?;
                env.delete_local_ref(value)?;
            }
            debug!(argc = args.len(), "Marshalled command arguments");

            let handle = call_static(
                env,
                &self.class,
                self.execute,
                EXECUTE.0,
                ReturnType::Primitive(Primitive::Int),
                &[JValue::Object(&array).as_jni()],
            )?
            .i()?;
            Ok(handle)
        })
    }

    fn wait(&self, cx: &ExecutionContext, handle: i32) -> BridgeResult<ExitCode> {
        let mut env = unsafe { env_from(cx) }?;
        let code = call_static(
            &mut env,
            &self.class,
            self.wait,
            WAIT.0,
            ReturnType::Primitive(Primitive::Int),
            &[JValue::Int(handle).as_jni()],
        )?
        .i()?;
        Ok(code)
    }

    fn read_output(&self, cx: &ExecutionContext, handle: i32) -> BridgeResult<Option<String>> {
        let mut env = unsafe { env_from(cx) }?;
        env.with_local_frame(LOCAL_FRAME_CAPACITY, |env| -> BridgeResult<Option<String>> {
            let output = call_static(
                env,
                &self.class,
                self.read,
                READ.0,
                ReturnType::Object,
                &[JValue::Int(handle).as_jni()],
            )?
            .l()?;

            if output.is_null() {
                return Ok(None);
            }
            let output = JString::from(output);
            let text: String = env.get_string(&output)?.into();
            Ok(Some(text))
        })
    }

    fn terminate(&self, cx: &ExecutionContext, handle: i32) -> BridgeResult<bool> {
        let mut env = unsafe { env_from(cx) }?;
        let terminated = call_static(
            &mut env,
            &self.class,
            self.terminate,
            TERMINATE.0,
            ReturnType::Primitive(Primitive::Boolean),
            &[JValue::Int(handle).as_jni()],
        )?
        .z()?;
        Ok(terminated)
    }

    fn cleanup(&self, cx: &ExecutionContext, handle: i32) -> BridgeResult<()> {
        let mut env = unsafe { env_from(cx) }?;
        call_static(
            &mut env,
            &self.class,
            self.cleanup,
            CLEANUP.0,
            ReturnType::Primitive(Primitive::Void),
            &[JValue::Int(handle).as_jni()],
        )?
        .v()?;
        Ok(())
    }
}

/// Static raw-log entry point on the host log manager
pub struct JniLogSink {
    class: GlobalRef,
    write_raw_log: JStaticMethodID,
}

impl LogSink for JniLogSink {
    fn write_raw_log(
        &self,
        cx: &ExecutionContext,
        level: &str,
        tag: &str,
        message: &str,
    ) -> BridgeResult<()> {
        let mut env = unsafe { env_from(cx) }?;
        env.with_local_frame(LOCAL_FRAME_CAPACITY, |env| -> BridgeResult<()> {
            let level = env.new_string(level)?;
            let tag = env.new_string(tag)?;
            let message = env.new_string(message)?;
            call_static(
                env,
                &self.class,
                self.write_raw_log,
                WRITE_RAW_LOG.0,
                ReturnType::Primitive(Primitive::Void),
                &[
                    JValue::Object(&level).as_jni(),
                    JValue::Object(&tag).as_jni(),
                    JValue::Object(&message).as_jni(),
                ],
            )?
            .v()?;
            Ok(())
        })
    }
}

/// The JVM that loaded this library
pub struct JniRuntime {
    vm: JavaVM,
}

impl JniRuntime {
    pub fn new(vm: JavaVM) -> Self {
        Self { vm }
    }
}

impl ForeignRuntime for JniRuntime {
    fn current_thread_context(&self) -> Option<ExecutionContext> {
        let env = self.vm.get_env().ok()?;
        ExecutionContext::from_raw(env.get_raw() as *mut c_void)
    }

    fn attach_current_thread(&self) -> BridgeResult<ExecutionContext> {
        let env = self
            .vm
            .attach_current_thread_permanently()
            .map_err(|e| BridgeError::unavailable(e.to_string()))?;
        ExecutionContext::from_raw(env.get_raw() as *mut c_void)
            .ok_or_else(|| BridgeError::unavailable("JVM returned a null JNIEnv"))
    }

    fn bind_process_owner(
        &self,
        cx: &ExecutionContext,
        class: &str,
    ) -> BridgeResult<Arc<dyn ProcessOwner>> {
        let mut env = unsafe { env_from(cx) }?;
        let class = resolve_class(&mut env, class)?;

        Ok(Arc::new(JniProcessOwner {
            execute: resolve_static(&mut env, &class, EXECUTE)?,
            wait: resolve_static(&mut env, &class, WAIT)?,
            read: resolve_static(&mut env, &class, READ)?,
            terminate: resolve_static(&mut env, &class, TERMINATE)?,
            cleanup: resolve_static(&mut env, &class, CLEANUP)?,
            class,
        }))
    }

    fn bind_log_sink(&self, cx: &ExecutionContext, class: &str) -> BridgeResult<Arc<dyn LogSink>> {
        let mut env = unsafe { env_from(cx) }?;
        let class = resolve_class(&mut env, class)?;

        Ok(Arc::new(JniLogSink {
            write_raw_log: resolve_static(&mut env, &class, WRITE_RAW_LOG)?,
            class,
        }))
    }
}

/// Library load hook: resolves the host classes into the global boundary.
#[no_mangle]
pub extern "system" fn JNI_OnLoad(vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) -> jint {
    crate::logging::init_tracing();
    info!("JNI_OnLoad called");

    // SAFETY: the JVM passes its own valid pointer to JNI_OnLoad.
    let vm = match unsafe { JavaVM::from_raw(vm) } {
        Ok(vm) => vm,
        Err(e) => {
            error!(error = %e, "Invalid JavaVM pointer");
            return JNI_ERR;
        }
    };

    let config = BridgeConfig::from_env();
    match manager::global().load(Arc::new(JniRuntime::new(vm)), &config) {
        Ok(()) => {
            info!("JNI initialized successfully");
            JNI_VERSION_1_6
        }
        Err(e) => {
            error!(error = %e, "JNI initialization failed");
            JNI_ERR
        }
    }
}

/// Library unload hook: drops global references and resets the boundary.
#[no_mangle]
pub extern "system" fn JNI_OnUnload(_vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) {
    info!("JNI_OnUnload called");
    manager::global().unload();
}
