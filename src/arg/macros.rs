/// Implements [`Arg`](arg/trait.Arg.html), [`Append`](arg/trait.Append.html)
/// and [`Get`](arg/trait.Get.html) for a named struct, marshalled as the
/// corresponding D-Bus struct (parenthesized signature).
///
/// # Example
///
/// ```
/// use dbus_fluent::dbus_struct;
///
/// #[derive(Debug, PartialEq)]
/// struct Song { title: String, length_s: u32 }
/// dbus_struct!(Song, title: String, length_s: u32);
///
/// use dbus_fluent::arg::Arg;
/// assert_eq!(&*Song::signature(), "(su)");
/// ```
#[macro_export]
macro_rules! dbus_struct {
    ($t: ident, $($field: ident: $fty: ty),+ $(,)?) => {

impl $crate::arg::Arg for $t {
    const ARG_TYPE: $crate::arg::ArgType = $crate::arg::ArgType::Struct;
    fn signature() -> $crate::Signature<'static> {
        <($($fty,)+) as $crate::arg::Arg>::signature()
    }
}

impl $crate::arg::Append for $t {
    fn append(self, i: &mut $crate::arg::IterAppend) {
        $crate::arg::Append::append(($(self.$field,)+), i)
    }
}

impl<'dbus_fluent_a> $crate::arg::Get<'dbus_fluent_a> for $t {
    fn get(i: &mut $crate::arg::Iter<'dbus_fluent_a>) -> Option<Self> {
        let ($($field,)+): ($($fty,)+) = i.get()?;
        Some($t { $($field),+ })
    }
}

    }
}

/// Implements [`Arg`](arg/trait.Arg.html), [`Append`](arg/trait.Append.html)
/// and [`Get`](arg/trait.Get.html) for a named struct, marshalled as a
/// dictionary of field names to variants (`a{sv}`).
///
/// The first token selects the deserialization policy for unknown dictionary
/// keys: `strict` fails the read, `relaxed` silently ignores them. Fields
/// missing from the dictionary are filled in with their `Default` value.
///
/// # Example
///
/// ```
/// use dbus_fluent::dbus_dict_struct;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Config { verbose: bool, retries: u32 }
/// dbus_dict_struct!(relaxed Config, verbose: bool, retries: u32);
///
/// use dbus_fluent::arg::Arg;
/// assert_eq!(&*Config::signature(), "a{sv}");
/// ```
#[macro_export]
macro_rules! dbus_dict_struct {
    (strict $t: ident, $($field: ident: $fty: ty),+ $(,)?) => {
        $crate::dbus_dict_struct!(@imp true, $t, $($field: $fty),+);
    };
    (relaxed $t: ident, $($field: ident: $fty: ty),+ $(,)?) => {
        $crate::dbus_dict_struct!(@imp false, $t, $($field: $fty),+);
    };
    (@imp $strict: expr, $t: ident, $($field: ident: $fty: ty),+) => {

impl $crate::arg::Arg for $t {
    const ARG_TYPE: $crate::arg::ArgType = $crate::arg::ArgType::Array;
    fn signature() -> $crate::Signature<'static> {
        <$crate::arg::PropMap as $crate::arg::Arg>::signature()
    }
}

impl $crate::arg::Append for $t {
    fn append(self, i: &mut $crate::arg::IterAppend) {
        i.append_container($crate::arg::ArgType::Array, Some("{sv}"), |s| {
            $(
                s.append_container($crate::arg::ArgType::DictEntry, None, |ss| {
                    ss.append(stringify!($field));
                    ss.append($crate::arg::Variant(self.$field));
                });
            )+
        });
    }
}

impl<'dbus_fluent_a> $crate::arg::Get<'dbus_fluent_a> for $t {
    fn get(i: &mut $crate::arg::Iter<'dbus_fluent_a>) -> Option<Self> {
        let mut si = i.recurse($crate::arg::ArgType::Array)?;
        $( let mut $field: Option<$fty> = None; )+
        while si.arg_type() == $crate::arg::ArgType::DictEntry {
            let mut entry = si.recurse($crate::arg::ArgType::DictEntry)?;
            let key: &str = entry.get()?;
            if !entry.next() { return None }
            match key {
                $(
                    stringify!($field) => {
                        $field = Some(entry.get::<$crate::arg::Variant<$fty>>()?.0);
                    }
                )+
                _ => { if $strict { return None } }
            }
            if !si.next() { break }
        }
        Some($t { $($field: $field.unwrap_or_default(),)+ })
    }
}

    }
}

/// Implements [`Arg`](arg/trait.Arg.html), [`Append`](arg/trait.Append.html)
/// and [`Get`](arg/trait.Get.html) for a fieldless enum, marshalled as its
/// underlying integer type.
///
/// Reading a value that does not correspond to any variant fails the read.
///
/// # Example
///
/// ```
/// use dbus_fluent::dbus_enum;
///
/// #[derive(Debug, Copy, Clone, PartialEq)]
/// enum PlaybackState { Stopped = 0, Playing = 1, Paused = 2 }
/// dbus_enum!(PlaybackState as u32, { Stopped = 0, Playing = 1, Paused = 2 });
///
/// use dbus_fluent::arg::Arg;
/// assert_eq!(&*PlaybackState::signature(), "u");
/// ```
#[macro_export]
macro_rules! dbus_enum {
    ($t: ident as $repr: ty, { $($variant: ident = $val: expr),+ $(,)? }) => {

impl $crate::arg::Arg for $t {
    const ARG_TYPE: $crate::arg::ArgType = <$repr as $crate::arg::Arg>::ARG_TYPE;
    fn signature() -> $crate::Signature<'static> {
        <$repr as $crate::arg::Arg>::signature()
    }
}

impl $crate::arg::Append for $t {
    fn append(self, i: &mut $crate::arg::IterAppend) {
        $crate::arg::Append::append(self as $repr, i)
    }
}

impl<'dbus_fluent_a> $crate::arg::Get<'dbus_fluent_a> for $t {
    fn get(i: &mut $crate::arg::Iter<'dbus_fluent_a>) -> Option<Self> {
        let v: $repr = i.get()?;
        match v {
            $( x if x == $val => Some($t::$variant), )+
            _ => None,
        }
    }
}

    }
}
