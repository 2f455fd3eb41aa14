// Reflection Cache - declarative member resolution
//
// Each foreign class binding declares a static table of members. Resolution
// walks the table top to bottom: a Class entry resolves the class and makes
// it the owner for the member entries that follow, and each member resolves
// against the current owner into a fixed slot. A failed mandatory entry
// aborts resolution and rolls back everything resolved so far; a failed
// optional entry leaves a null slot so callers can feature-detect.

use crate::error::BridgeError;
use crate::runtime::{clear_exception, exception_check, Bridge, CallEnv, Handle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Class resolved through the system path.
    Class,
    /// Class resolved through the registered application loader.
    ApplicationClass,
    Field,
    StaticField,
    Method,
    StaticMethod,
}

/// One row of a class-binding table.
pub struct MemberSpec {
    pub owner: &'static str,
    pub name: &'static str,
    pub signature: &'static str,
    pub kind: MemberKind,
    pub slot: usize,
    pub mandatory: bool,
}

/// Resolved handles, indexed by `MemberSpec::slot`. Class slots own a
/// reference (global or local, per the `global` flag at resolution);
/// member slots are plain ids and need no release.
pub struct ReflectionCache {
    slots: Vec<Handle>,
    global: bool,
    released: bool,
}

impl ReflectionCache {
    /// Resolves every entry of `table`. With `global` set, class references
    /// are promoted to globals so the cache outlives the resolving thread.
    pub fn resolve(
        bridge: &Bridge,
        env: &dyn CallEnv,
        table: &[MemberSpec],
        global: bool,
    ) -> Result<Self, BridgeError> {
        let slot_count = table.iter().map(|m| m.slot + 1).max().unwrap_or(0);
        let mut cache = ReflectionCache {
            slots: vec![0; slot_count],
            global,
            released: false,
        };

        let mut owner: Handle = 0;
        for spec in table {
            let resolved = match spec.kind {
                MemberKind::Class | MemberKind::ApplicationClass => {
                    let local = if spec.kind == MemberKind::ApplicationClass {
                        match bridge.find_application_class(env, spec.name) {
                            Ok(h) => h,
                            Err(_) if !spec.mandatory => 0,
                            Err(e) => {
                                cache.release(env, table);
                                return Err(e);
                            }
                        }
                    } else {
                        env.find_class(spec.name)
                    };
                    if local == 0 || env.exception_pending() {
                        owner = 0;
                        0
                    } else if global {
                        let g = env.new_global_ref(local);
                        env.delete_local_ref(local);
                        owner = g;
                        g
                    } else {
                        owner = local;
                        local
                    }
                }
                MemberKind::Field
                | MemberKind::StaticField
                | MemberKind::Method
                | MemberKind::StaticMethod => {
                    if owner == 0 {
                        cache.release(env, table);
                        return Err(BridgeError::InvalidArgument(format!(
                            "member {}.{} listed before its class",
                            spec.owner, spec.name
                        )));
                    }
                    match spec.kind {
                        MemberKind::Field => env.get_field(owner, spec.name, spec.signature),
                        MemberKind::StaticField => {
                            env.get_static_field(owner, spec.name, spec.signature)
                        }
                        MemberKind::Method => env.get_method(owner, spec.name, spec.signature),
                        MemberKind::StaticMethod => {
                            env.get_static_method(owner, spec.name, spec.signature)
                        }
                        _ => unreachable!(),
                    }
                }
            };

            if resolved == 0 || env.exception_pending() {
                if spec.mandatory {
                    let err = exception_check(env).err().unwrap_or_else(|| {
                        BridgeError::External(format!(
                            "could not resolve {} {}{}",
                            spec.owner, spec.name, spec.signature
                        ))
                    });
                    cache.release(env, table);
                    return Err(err);
                }
                clear_exception(env);
                cache.slots[spec.slot] = 0;
            } else {
                cache.slots[spec.slot] = resolved;
            }
        }
        Ok(cache)
    }

    /// Resolved handle for a slot; 0 when an optional member was absent.
    pub fn handle(&self, slot: usize) -> Handle {
        self.slots.get(slot).copied().unwrap_or(0)
    }

    /// Drops every class reference held by the cache. Idempotent.
    pub fn release(&mut self, env: &dyn CallEnv, table: &[MemberSpec]) {
        if self.released {
            return;
        }
        self.released = true;
        for spec in table {
            if matches!(spec.kind, MemberKind::Class | MemberKind::ApplicationClass) {
                let handle = self.slots[spec.slot];
                if handle != 0 {
                    if self.global {
                        env.delete_global_ref(handle);
                    } else {
                        env.delete_local_ref(handle);
                    }
                }
            }
        }
        for slot in self.slots.iter_mut() {
            *slot = 0;
        }
    }
}
