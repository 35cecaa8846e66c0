//! Server-side Lua scripts

use std::sync::OnceLock;

use redis::Script;

/// Delete `KEYS[1]` only if it still holds `ARGV[1]`; returns 1 on delete, 0 otherwise.
const RELEASE_LOCK: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

/// Owner-checked lock release, evaluated atomically on the server.
pub fn release_lock() -> &'static Script {
    static SCRIPT: OnceLock<Script> = OnceLock::new();
    SCRIPT.get_or_init(|| Script::new(RELEASE_LOCK))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_script_is_cached() {
        let first = release_lock();
        let second = release_lock();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.get_hash(), second.get_hash());
    }
}
