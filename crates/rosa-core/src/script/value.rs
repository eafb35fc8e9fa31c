use std::cell::Cell;

use mlua::{
    AnyUserData, IntoLua, Lua, MetaMethod, UserData, UserDataFields, UserDataMethods,
    UserDataRef, Value, Variadic,
};

use crate::error::Error;
use crate::game::{RotMatrix, Vector};
use crate::memory::Place;

/// Script vector, either free-standing or a field of a host record
#[derive(Debug)]
pub struct LuaVector(Cell<Place<Vector>>);

/// Script rotation matrix, either free-standing or a field of a host record
#[derive(Debug)]
pub struct LuaRotMatrix(Cell<Place<RotMatrix>>);

macro_rules! place_value {
    ($name:ident, $ty:ty) => {
        impl $name {
            pub fn owned(value: $ty) -> Self {
                Self(Cell::new(Place::Owned(value)))
            }

            /// Proxy writing through to `ptr`; `None` when null
            ///
            /// # Safety
            /// See [`Place::host`].
            pub unsafe fn host(ptr: *mut $ty) -> Option<Self> {
                unsafe { Place::host(ptr) }.map(|place| Self(Cell::new(place)))
            }

            pub fn get(&self) -> $ty {
                self.0.get().get()
            }

            pub fn set(&self, value: $ty) {
                let mut place = self.0.get();
                place.set(value);
                self.0.set(place);
            }

            pub fn update(&self, f: impl FnOnce(&mut $ty)) {
                let mut value = self.get();
                f(&mut value);
                self.set(value);
            }

            pub fn address(&self) -> Option<usize> {
                self.0.get().address()
            }
        }
    };
}

place_value!(LuaVector, Vector);
place_value!(LuaRotMatrix, RotMatrix);

fn number(value: &Value) -> Option<f32> {
    match value {
        Value::Integer(i) => Some(*i as f32),
        Value::Number(n) => Some(*n as f32),
        _ => None,
    }
}

/// Copy of the vector held by a script value
pub fn to_vector(value: &Value) -> Option<Vector> {
    let ud = value.as_userdata()?;
    ud.borrow::<LuaVector>().ok().map(|v| v.get())
}

/// Copy of the rotation held by a script value
pub fn to_rotation(value: &Value) -> Option<RotMatrix> {
    let ud = value.as_userdata()?;
    ud.borrow::<LuaRotMatrix>().ok().map(|r| r.get())
}

fn multiply(lua: &Lua, a: Value, b: Value) -> mlua::Result<Value> {
    if let Some(v) = to_vector(&a) {
        if let Some(scalar) = number(&b) {
            return LuaVector::owned(v * scalar).into_lua(lua);
        }
        if let Some(rot) = to_rotation(&b) {
            return LuaVector::owned(v.rotate(&rot)).into_lua(lua);
        }
    }
    if let (Some(scalar), Some(v)) = (number(&a), to_vector(&b)) {
        return LuaVector::owned(v * scalar).into_lua(lua);
    }
    if let (Some(x), Some(y)) = (to_rotation(&a), to_rotation(&b)) {
        return LuaRotMatrix::owned(x * y).into_lua(lua);
    }
    Err(Error::InvalidArgument(format!(
        "cannot multiply {} by {}",
        a.type_name(),
        b.type_name()
    ))
    .into())
}

impl UserData for LuaVector {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("x", |_, this| Ok(this.get().x));
        fields.add_field_method_get("y", |_, this| Ok(this.get().y));
        fields.add_field_method_get("z", |_, this| Ok(this.get().z));
        fields.add_field_method_set("x", |_, this, x: f32| {
            this.update(|v| v.x = x);
            Ok(())
        });
        fields.add_field_method_set("y", |_, this, y: f32| {
            this.update(|v| v.y = y);
            Ok(())
        });
        fields.add_field_method_set("z", |_, this, z: f32| {
            this.update(|v| v.z = z);
            Ok(())
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.get().to_string()));
        methods.add_meta_method(MetaMethod::Add, |_, this, other: UserDataRef<LuaVector>| {
            Ok(LuaVector::owned(this.get() + other.get()))
        });
        methods.add_meta_method(MetaMethod::Sub, |_, this, other: UserDataRef<LuaVector>| {
            Ok(LuaVector::owned(this.get() - other.get()))
        });
        methods.add_meta_function(MetaMethod::Mul, |lua, (a, b): (Value, Value)| {
            multiply(lua, a, b)
        });
        methods.add_meta_method(MetaMethod::Div, |_, this, scalar: f32| {
            Ok(LuaVector::owned(this.get() / scalar))
        });
        methods.add_meta_method(MetaMethod::Unm, |_, this, ()| Ok(LuaVector::owned(-this.get())));

        methods.add_method("add", |_, this, other: UserDataRef<LuaVector>| {
            let other = other.get();
            this.update(|v| *v = *v + other);
            Ok(())
        });
        methods.add_method("mult", |_, this, scalar: f32| {
            this.update(|v| *v = *v * scalar);
            Ok(())
        });
        methods.add_method("set", |_, this, other: UserDataRef<LuaVector>| {
            this.set(other.get());
            Ok(())
        });
        methods.add_method("clone", |_, this, ()| Ok(LuaVector::owned(this.get())));
        methods.add_method("dist", |_, this, other: UserDataRef<LuaVector>| {
            Ok(this.get().dist(&other.get()))
        });
        methods.add_method("distSquare", |_, this, other: UserDataRef<LuaVector>| {
            Ok(this.get().dist_square(&other.get()))
        });
    }
}

impl UserData for LuaRotMatrix {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        macro_rules! components {
            ($($name:literal => $field:ident),*) => {$(
                fields.add_field_method_get($name, |_, this| Ok(this.get().$field));
                fields.add_field_method_set($name, |_, this, value: f32| {
                    this.update(|r| r.$field = value);
                    Ok(())
                });
            )*};
        }
        components!(
            "x1" => x1, "y1" => y1, "z1" => z1,
            "x2" => x2, "y2" => y2, "z2" => z2,
            "x3" => x3, "y3" => y3, "z3" => z3
        );
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.get().to_string()));
        methods.add_meta_function(MetaMethod::Mul, |lua, (a, b): (Value, Value)| {
            multiply(lua, a, b)
        });
        methods.add_method("set", |_, this, other: UserDataRef<LuaRotMatrix>| {
            this.set(other.get());
            Ok(())
        });
        methods.add_method("clone", |_, this, ()| Ok(LuaRotMatrix::owned(this.get())));
    }
}

/// Address a vector or rotation proxy writes through to
pub fn place_address(ud: &AnyUserData) -> Option<usize> {
    if let Ok(v) = ud.borrow::<LuaVector>() {
        return v.address();
    }
    ud.borrow::<LuaRotMatrix>().ok().and_then(|r| r.address())
}

pub fn install(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();
    globals.set(
        "Vector",
        lua.create_function(|_, (x, y, z): (Option<f32>, Option<f32>, Option<f32>)| {
            Ok(LuaVector::owned(Vector::new(
                x.unwrap_or_default(),
                y.unwrap_or_default(),
                z.unwrap_or_default(),
            )))
        })?,
    )?;
    globals.set(
        "RotMatrix",
        lua.create_function(|_, values: Variadic<f32>| match values.as_slice() {
            [] => Ok(LuaRotMatrix::owned(RotMatrix::IDENTITY)),
            &[x1, y1, z1, x2, y2, z2, x3, y3, z3] => Ok(LuaRotMatrix::owned(
                RotMatrix::from_rows([x1, y1, z1], [x2, y2, z2], [x3, y3, z3]),
            )),
            other => Err(Error::InvalidArgument(format!(
                "RotMatrix takes 0 or 9 numbers, got {}",
                other.len()
            ))
            .into()),
        })?,
    )?;
    Ok(())
}
