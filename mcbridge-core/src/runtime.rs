// Runtime Call Layer - foreign managed-runtime access
//
// Every interaction with the platform codec goes through an opaque call
// layer modeled by two traits:
//
// 1. `VmRuntime` - process-wide VM handle (attach/detach threads)
// 2. `CallEnv` - per-thread call environment (lookups, calls, refs)
//
// Handles are opaque u64 tokens; 0 is the null handle. The concrete
// backend is injected at startup via `Bridge::install_global` (or per
// instance for tests), so nothing in this crate links against a real VM.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::error;

use crate::error::BridgeError;

// ============================================================================
// Handles and values
// ============================================================================

/// Opaque token naming an object, class, or member inside the foreign
/// runtime. 0 is the null handle.
pub type Handle = u64;

/// Argument/return pack for foreign calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Void,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Object(Handle),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<Handle> {
        match self {
            Value::Object(v) => Some(*v),
            _ => None,
        }
    }
}

// ============================================================================
// Call environment
// ============================================================================

/// Per-thread call environment. All operations report failure through the
/// foreign runtime's pending-exception mechanism: a returned null handle
/// paired with `exception_pending()` means the lookup or call failed.
pub trait CallEnv: Send + Sync {
    // Lookups
    fn find_class(&self, name: &str) -> Handle;
    fn get_method(&self, class: Handle, name: &str, signature: &str) -> Handle;
    fn get_static_method(&self, class: Handle, name: &str, signature: &str) -> Handle;
    fn get_field(&self, class: Handle, name: &str, signature: &str) -> Handle;
    fn get_static_field(&self, class: Handle, name: &str, signature: &str) -> Handle;

    // Calls
    fn new_object(&self, class: Handle, ctor: Handle, args: &[Value]) -> Handle;
    fn call_method(&self, object: Handle, method: Handle, args: &[Value]) -> Value;
    fn call_static_method(&self, class: Handle, method: Handle, args: &[Value]) -> Value;

    // Field access
    fn int_field(&self, object: Handle, field: Handle) -> i32;
    fn long_field(&self, object: Handle, field: Handle) -> i64;
    fn static_int_field(&self, class: Handle, field: Handle) -> i32;

    // Strings, arrays, buffers
    fn new_string(&self, value: &str) -> Handle;
    fn string_value(&self, string: Handle) -> Option<String>;
    fn array_length(&self, array: Handle) -> i32;
    fn array_element(&self, array: Handle, index: i32) -> Handle;
    /// Base pointer and capacity of a direct byte buffer, if it has one.
    fn direct_buffer(&self, buffer: Handle) -> Option<(*mut u8, usize)>;
    fn new_direct_buffer(&self, data: &[u8]) -> Handle;

    // References
    fn object_class(&self, object: Handle) -> Handle;
    fn new_global_ref(&self, object: Handle) -> Handle;
    fn delete_global_ref(&self, object: Handle);
    fn delete_local_ref(&self, object: Handle);

    // Exceptions
    fn exception_pending(&self) -> bool;
    /// Clears the pending exception and returns the throwable, if any.
    fn take_exception(&self) -> Option<Handle>;
}

/// Process-wide VM handle.
pub trait VmRuntime: Send + Sync {
    /// Environment of the current thread, if it is already attached.
    fn current_env(&self) -> Option<Arc<dyn CallEnv>>;
    /// Attach the current thread and return its environment.
    fn attach_current_thread(&self) -> Result<Arc<dyn CallEnv>, BridgeError>;
    /// Detach the current thread.
    fn detach_current_thread(&self);
}

// ============================================================================
// Bridge - VM registry and attach guard
// ============================================================================

struct LoaderBinding {
    loader: Handle,
    load_method: Handle,
}

/// Entry point to the foreign runtime: wraps a [`VmRuntime`] plus the
/// optional application class-loader binding used to resolve classes the
/// system loader cannot see on worker threads.
pub struct Bridge {
    vm: Arc<dyn VmRuntime>,
    loader: Mutex<Option<LoaderBinding>>,
}

static GLOBAL_BRIDGE: OnceCell<Arc<Bridge>> = OnceCell::new();

impl Bridge {
    pub fn new(vm: Arc<dyn VmRuntime>) -> Arc<Self> {
        Arc::new(Bridge {
            vm,
            loader: Mutex::new(None),
        })
    }

    /// Registers the process-wide bridge. The first registration wins;
    /// later calls against a different VM fail.
    pub fn install_global(bridge: Arc<Bridge>) -> Result<(), BridgeError> {
        let stored = GLOBAL_BRIDGE.get_or_init(|| bridge.clone());
        if Arc::ptr_eq(stored, &bridge) {
            Ok(())
        } else {
            Err(BridgeError::InvalidArgument(
                "a different runtime is already installed".into(),
            ))
        }
    }

    pub fn global() -> Option<Arc<Bridge>> {
        GLOBAL_BRIDGE.get().cloned()
    }

    /// Returns an attached environment for the current thread. If the
    /// thread was not already attached, the guard detaches it on drop.
    pub fn attach(self: &Arc<Self>) -> Result<AttachGuard, BridgeError> {
        if let Some(env) = self.vm.current_env() {
            return Ok(AttachGuard {
                bridge: self.clone(),
                env,
                attached: false,
            });
        }
        let env = self.vm.attach_current_thread()?;
        Ok(AttachGuard {
            bridge: self.clone(),
            env,
            attached: true,
        })
    }

    /// Binds the application class loader. Resolution keeps a global ref
    /// to the loader object and its load method.
    pub fn register_class_loader(
        self: &Arc<Self>,
        env: &dyn CallEnv,
        loader: Handle,
    ) -> Result<(), BridgeError> {
        let class = env.object_class(loader);
        exception_check(env)?;
        let load_method =
            env.get_method(class, "loadClass", "(Ljava/lang/String;)Ljava/lang/Class;");
        env.delete_local_ref(class);
        exception_check(env)?;
        let global = env.new_global_ref(loader);
        exception_check(env)?;
        let mut slot = self.loader.lock();
        if let Some(old) = slot.take() {
            env.delete_global_ref(old.loader);
        }
        *slot = Some(LoaderBinding {
            loader: global,
            load_method,
        });
        Ok(())
    }

    pub fn has_class_loader(&self) -> bool {
        self.loader.lock().is_some()
    }

    /// Resolves a class through the registered application loader. Class
    /// names use dotted form on the loader path.
    pub fn find_application_class(
        &self,
        env: &dyn CallEnv,
        name: &str,
    ) -> Result<Handle, BridgeError> {
        let binding = self.loader.lock();
        let binding = binding.as_ref().ok_or_else(|| {
            BridgeError::InvalidArgument("no application class loader registered".into())
        })?;
        let dotted = name.replace('/', ".");
        let class_name = env.new_string(&dotted);
        exception_check(env)?;
        let result = env.call_method(
            binding.loader,
            binding.load_method,
            &[Value::Object(class_name)],
        );
        env.delete_local_ref(class_name);
        exception_check(env)?;
        Ok(result.as_object().unwrap_or(0))
    }
}

/// Scoped thread attachment. Detaches on drop only if this guard did the
/// attaching; nested guards on an already-attached thread are no-ops.
pub struct AttachGuard {
    bridge: Arc<Bridge>,
    env: Arc<dyn CallEnv>,
    attached: bool,
}

impl AttachGuard {
    pub fn env(&self) -> &Arc<dyn CallEnv> {
        &self.env
    }

    pub fn attached(&self) -> bool {
        self.attached
    }
}

impl Drop for AttachGuard {
    fn drop(&mut self) {
        if self.attached {
            self.bridge.vm.detach_current_thread();
        }
    }
}

// ============================================================================
// Exception handling
// ============================================================================

/// Checks for a pending foreign exception. If one is pending it is
/// cleared, summarized, logged, and returned as `BridgeError::External`.
pub fn exception_check(env: &dyn CallEnv) -> Result<(), BridgeError> {
    if !env.exception_pending() {
        return Ok(());
    }
    let summary = match env.take_exception() {
        Some(throwable) => {
            let s = exception_summary(env, throwable);
            env.delete_local_ref(throwable);
            s
        }
        None => "Exception occured".to_string(),
    };
    error!("{}", summary);
    Err(BridgeError::External(summary))
}

/// Clears any pending foreign exception without logging. Returns true if
/// one was pending.
pub fn clear_exception(env: &dyn CallEnv) -> bool {
    if !env.exception_pending() {
        return false;
    }
    if let Some(throwable) = env.take_exception() {
        env.delete_local_ref(throwable);
    }
    true
}

/// Builds a one-line "ClassName: message" summary of a throwable. Partial
/// reflection failures degrade to whichever half could be read.
pub fn exception_summary(env: &dyn CallEnv, throwable: Handle) -> String {
    let name = throwable_class_name(env, throwable);
    let message = throwable_message(env, throwable);
    match (name, message) {
        (Some(name), Some(message)) => format!("{}: {}", name, message),
        (Some(name), None) => format!("{} occured", name),
        (None, Some(message)) => format!("Exception: {}", message),
        (None, None) => "Exception occured".to_string(),
    }
}

fn throwable_class_name(env: &dyn CallEnv, throwable: Handle) -> Option<String> {
    let class = env.object_class(throwable);
    if class == 0 || clear_exception(env) {
        return None;
    }
    // getName lives on java.lang.Class, reached via the class of the class.
    let class_class = env.object_class(class);
    if class_class == 0 || clear_exception(env) {
        env.delete_local_ref(class);
        return None;
    }
    let get_name = env.get_method(class_class, "getName", "()Ljava/lang/String;");
    env.delete_local_ref(class_class);
    if get_name == 0 || clear_exception(env) {
        env.delete_local_ref(class);
        return None;
    }
    let name_obj = env.call_method(class, get_name, &[]);
    env.delete_local_ref(class);
    if clear_exception(env) {
        return None;
    }
    let name_obj = name_obj.as_object().filter(|h| *h != 0)?;
    let name = env.string_value(name_obj);
    env.delete_local_ref(name_obj);
    name
}

fn throwable_message(env: &dyn CallEnv, throwable: Handle) -> Option<String> {
    let class = env.object_class(throwable);
    if class == 0 || clear_exception(env) {
        return None;
    }
    let get_message = env.get_method(class, "getMessage", "()Ljava/lang/String;");
    env.delete_local_ref(class);
    if get_message == 0 || clear_exception(env) {
        return None;
    }
    let message_obj = env.call_method(throwable, get_message, &[]);
    if clear_exception(env) {
        return None;
    }
    let message_obj = message_obj.as_object().filter(|h| *h != 0)?;
    let message = env.string_value(message_obj);
    env.delete_local_ref(message_obj);
    message
}

// ============================================================================
// Tests
// ============================================================================
