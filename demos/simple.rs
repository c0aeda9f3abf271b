use std::sync::Arc;

use larder::{downcast, schema, Instance, Overrides, Registry, RegistryError, SchemaIntrospector};

// Define regular service types

struct Console {
    prefix: String,
}

impl Console {
    fn new(prefix: String) -> Self {
        Self { prefix }
    }

    fn say(&self, message: &str) {
        println!("{} {}", self.prefix, message);
    }
}

struct Reporter {
    console: Arc<Console>,
    signature: String,
}

impl Reporter {
    fn new(console: Arc<Console>, signature: String) -> Self {
        Self { console, signature }
    }

    fn report(&self, message: &str) {
        self.console.say(&format!("{} {}", message, self.signature));
    }
}

fn main() -> Result<(), RegistryError> {
    tracing_subscriber::fmt::init();

    // Declare how each type is constructed
    let mut schemas = SchemaIntrospector::new();
    schema!(schemas, "demo.Console", Console::new,
        prefix: String = String::from("[demo]"));
    schema!(schemas, "demo.Reporter", Reporter::new,
        console: shared Console => "demo.Console",
        signature: String = String::from("-- larder"),
    );

    let mut registry = Registry::with_introspector(Arc::new(schemas));

    // A lazily-built shared console, plus a short alias for it
    registry.set_factory(
        "demo.Console",
        |_| Ok(Arc::new(Console::new(String::from("[shared]"))) as Instance),
        false,
    )?;
    registry.set_alias("console", "demo.Console", false)?;

    let console = downcast::<Console>(registry.get("console")?).unwrap();
    console.say("the shared console is ready");

    // Resolution injects the registered console and honors the override
    let reporter = registry.resolve_with(
        "demo.Reporter",
        &Overrides::new().with("signature", String::from("-- yours truly")),
    )?;
    let reporter = downcast::<Reporter>(reporter).unwrap();
    reporter.report("resolution complete");

    assert!(Arc::ptr_eq(&reporter.console, &console));
    Ok(())
}
