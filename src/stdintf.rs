//! Standard D-Bus interfaces.
//!
//! See the [D-Bus specification](https://dbus.freedesktop.org/doc/dbus-specification.html#standard-interfaces)
//! for more information about these standard interfaces.

/// The org.freedesktop.DBus interfaces known to this crate.
pub mod org_freedesktop_dbus {
    use crate::arg::{AppendAll, ReadAll, Iter, IterAppend, PropMap, TypeMismatchError};

    /// The name of the standard properties interface.
    pub const PROPERTIES: &str = "org.freedesktop.DBus.Properties";

    /// The name of the `PropertiesChanged` signal.
    pub const PROPERTIES_CHANGED: &str = "PropertiesChanged";

    /// Struct to send/receive the PropertiesChanged signal of the
    /// [org.freedesktop.DBus.Properties](https://dbus.freedesktop.org/doc/dbus-specification.html#standard-interfaces-properties) interface.
    #[derive(Debug, Default)]
    pub struct PropertiesPropertiesChanged {
        /// The interface whose properties changed.
        pub interface_name: String,
        /// Changed properties with their new values.
        pub changed_properties: PropMap,
        /// Properties that changed without their new value being broadcast.
        pub invalidated_properties: Vec<String>,
    }

    impl ReadAll for PropertiesPropertiesChanged {
        fn read(i: &mut Iter) -> Result<Self, TypeMismatchError> {
            Ok(PropertiesPropertiesChanged {
                interface_name: i.read()?,
                changed_properties: i.read()?,
                invalidated_properties: i.read()?,
            })
        }
    }

    impl AppendAll for PropertiesPropertiesChanged {
        fn append(self, i: &mut IterAppend) {
            i.append(self.interface_name);
            i.append(self.changed_properties);
            i.append(self.invalidated_properties);
        }
    }
}
