#![forbid(unsafe_code)]

//! Four-level reference graph: `Owner.Complex.Value.IntProperty.Value`.
//!
//! Every level raises its own change notification. Setters on the
//! intermediate levels always raise (replacement semantics); the terminal
//! `IntProperty.Value` raises only when the value differs.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pathwatch::{
    ChangeNotifier, Model, Notifiable, PathBuilder, PropertyDescriptor, TypeRegistry, TypedPath,
};

macro_rules! notifying_model {
    ($ty:ident) => {
        impl Model for $ty {
            fn notifiable(&self) -> Option<&dyn Notifiable> {
                Some(&self.notifier)
            }

            fn type_name(&self) -> &'static str {
                stringify!($ty)
            }
        }

        impl $ty {
            #[must_use]
            pub fn listener_count(&self) -> usize {
                self.notifier.listener_count()
            }
        }
    };
}

#[derive(Debug, Default)]
pub struct Owner {
    notifier: ChangeNotifier,
    complex: RefCell<Option<Rc<Complex>>>,
    title: RefCell<String>,
}

#[derive(Debug, Default)]
pub struct Complex {
    notifier: ChangeNotifier,
    value: RefCell<Option<Rc<Holder>>>,
}

#[derive(Debug, Default)]
pub struct Holder {
    notifier: ChangeNotifier,
    int_property: RefCell<Option<Rc<IntProperty>>>,
}

#[derive(Debug, Default)]
pub struct IntProperty {
    notifier: ChangeNotifier,
    value: Cell<i32>,
}

notifying_model!(Owner);
notifying_model!(Complex);
notifying_model!(Holder);
notifying_model!(IntProperty);

impl Owner {
    pub const COMPLEX: &'static str = "Complex";
    pub const TITLE: &'static str = "Title";

    /// Fully populated graph with terminal value `value`.
    #[must_use]
    pub fn populated(value: i32) -> Rc<Self> {
        let owner = Rc::new(Self::default());
        *owner.complex.borrow_mut() = Some(Complex::populated(value));
        owner
    }

    #[must_use]
    pub fn empty() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[must_use]
    pub fn complex(&self) -> Option<Rc<Complex>> {
        self.complex.borrow().clone()
    }

    pub fn set_complex(&self, complex: Option<Rc<Complex>>) {
        self.notifier.replace(&self.complex, Self::COMPLEX, complex);
    }

    #[must_use]
    pub fn title(&self) -> String {
        self.title.borrow().clone()
    }

    /// Unrelated property on the root.
    pub fn set_title(&self, title: impl Into<String>) {
        self.notifier.assign(&self.title, Self::TITLE, title.into());
    }

    /// Raise "every property changed" without changing anything.
    pub fn refresh(&self) {
        self.notifier.raise_all();
    }

    /// Terminal value, `None` if any hop is null.
    #[must_use]
    pub fn leaf_value(&self) -> Option<i32> {
        self.int_property().map(|p| p.value())
    }

    #[must_use]
    pub fn int_property(&self) -> Option<Rc<IntProperty>> {
        self.complex()?.value()?.int_property()
    }
}

impl Complex {
    pub const VALUE: &'static str = "Value";

    #[must_use]
    pub fn populated(value: i32) -> Rc<Self> {
        let complex = Rc::new(Self::default());
        *complex.value.borrow_mut() = Some(Holder::populated(value));
        complex
    }

    #[must_use]
    pub fn empty() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[must_use]
    pub fn value(&self) -> Option<Rc<Holder>> {
        self.value.borrow().clone()
    }

    pub fn set_value(&self, value: Option<Rc<Holder>>) {
        self.notifier.replace(&self.value, Self::VALUE, value);
    }
}

impl Holder {
    pub const INT_PROPERTY: &'static str = "IntProperty";

    #[must_use]
    pub fn populated(value: i32) -> Rc<Self> {
        let holder = Rc::new(Self::default());
        *holder.int_property.borrow_mut() = Some(IntProperty::new(value));
        holder
    }

    #[must_use]
    pub fn empty() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[must_use]
    pub fn int_property(&self) -> Option<Rc<IntProperty>> {
        self.int_property.borrow().clone()
    }

    pub fn set_int_property(&self, property: Option<Rc<IntProperty>>) {
        self.notifier
            .replace(&self.int_property, Self::INT_PROPERTY, property);
    }
}

impl IntProperty {
    pub const VALUE: &'static str = "Value";

    #[must_use]
    pub fn new(value: i32) -> Rc<Self> {
        Rc::new(Self {
            notifier: ChangeNotifier::new(),
            value: Cell::new(value),
        })
    }

    #[must_use]
    pub fn value(&self) -> i32 {
        self.value.get()
    }

    /// Returns whether a change was raised.
    pub fn set_value(&self, value: i32) -> bool {
        self.notifier.assign_cell(&self.value, Self::VALUE, value)
    }
}

/// Typed `owner.Complex.Value.IntProperty.Value`.
#[must_use]
pub fn deep_path() -> TypedPath<Owner, i32> {
    PathBuilder::<Owner>::new()
        .then(Owner::COMPLEX, Owner::complex)
        .then(Complex::VALUE, Complex::value)
        .then(Holder::INT_PROPERTY, Holder::int_property)
        .value(IntProperty::VALUE, IntProperty::value)
}

/// Typed `owner.Complex.Value`.
#[must_use]
pub fn holder_path() -> TypedPath<Owner, Rc<Holder>> {
    PathBuilder::<Owner>::new()
        .then(Owner::COMPLEX, Owner::complex)
        .then(Complex::VALUE, Complex::value)
        .finish()
        .expect("two hops")
}

/// Registry covering every property of the reference graph.
#[must_use]
pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    for descriptor in [
        PropertyDescriptor::navigable::<Owner, Complex>(Owner::COMPLEX, Owner::complex),
        PropertyDescriptor::leaf::<Owner>(Owner::TITLE),
        PropertyDescriptor::navigable::<Complex, Holder>(Complex::VALUE, Complex::value),
        PropertyDescriptor::navigable::<Holder, IntProperty>(
            Holder::INT_PROPERTY,
            Holder::int_property,
        ),
        PropertyDescriptor::leaf::<IntProperty>(IntProperty::VALUE),
    ] {
        registry
            .register(descriptor)
            .expect("reference graph properties are distinct");
    }
    registry
}
