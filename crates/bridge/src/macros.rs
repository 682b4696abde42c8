/// Dispatches one engine entry point through [`crate::isolate::Isolate::call`].
///
/// `engine_call!(isolate, create_network(name, id))` expands to a call of
/// `api.create_network(thread, name, id, exc)` on an attached thread.
///
/// With `=> wrap`, the raw value is passed to `wrap` on the attached thread
/// before the outcome is checked, so an owning wrapper releases it when the
/// call fails.
macro_rules! engine_call {
    ($isolate:expr, $func:ident($($arg:expr),* $(,)?) => $wrap:path) => {{
        let isolate: &$crate::isolate::Isolate = $isolate;
        isolate.call(|thread, exc| unsafe {
            $wrap((isolate.api().$func)(thread, $($arg,)* exc))
        })
    }};
    ($isolate:expr, $func:ident($($arg:expr),* $(,)?)) => {{
        let isolate: &$crate::isolate::Isolate = $isolate;
        isolate.call(|thread, exc| unsafe { (isolate.api().$func)(thread, $($arg,)* exc) })
    }};
}

/// Declares a host enum mirrored by an integer field on the engine side.
macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            #[must_use]
            pub const fn as_raw(self) -> ::std::ffi::c_int {
                match self {
                    $( Self::$variant => $value ),+
                }
            }
        }

        impl TryFrom<::std::ffi::c_int> for $name {
            type Error = $crate::error::Error;

            fn try_from(value: ::std::ffi::c_int) -> $crate::error::Result<Self> {
                match value {
                    $( $value => Ok(Self::$variant), )+
                    _ => Err($crate::error::Error::InvalidEnum { kind: $kind, value }),
                }
            }
        }
    };
}
