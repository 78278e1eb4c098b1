//! Logging shims: forward to `defmt` when the feature is on, otherwise only
//! borrow the arguments so callers stay warning-free on the host.
#![macro_use]
#![allow(unused_macros)]

macro_rules! log {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::$level!($s $(, $x)*);
            #[cfg(not(feature = "defmt"))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! trace {
    ($($t:tt)*) => { log!(trace, $($t)*) };
}

macro_rules! debug {
    ($($t:tt)*) => { log!(debug, $($t)*) };
}

macro_rules! info {
    ($($t:tt)*) => { log!(info, $($t)*) };
}

macro_rules! warn {
    ($($t:tt)*) => { log!(warn, $($t)*) };
}
