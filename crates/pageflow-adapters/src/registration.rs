//! Alta de usuario: formulario -> validación -> confirmación -> fin.
//!
//! Los datos llegan en el payload de cada petición; sólo lo validado se
//! guarda en los atributos de la instancia.

use pageflow_core::{ActionContext, ActionError, MethodTable};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const REGISTRATION_CLASS: &str = "RegistrationAction";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
}

impl Registration {
    /// Lista de problemas; vacía si el alta es válida.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("name is required".to_string());
        }
        if !self.email.contains('@') {
            problems.push(format!("'{}' is not an e-mail address", self.email));
        }
        problems
    }
}

fn registration_from(payload: &Value) -> Option<Registration> {
    serde_json::from_value(payload.clone()).ok()
}

fn validate(ctx: &mut ActionContext<'_>) -> Result<&'static str, ActionError> {
    let Some(registration) = registration_from(ctx.payload) else {
        ctx.attributes.set("errors", vec!["name and email are required".to_string()]);
        return Ok("invalid");
    };
    let problems = registration.problems();
    if !problems.is_empty() {
        ctx.attributes.set("errors", problems);
        return Ok("invalid");
    }
    let value = serde_json::to_value(&registration).map_err(|e| ActionError::failed(e.to_string()))?;
    ctx.attributes.remove("errors");
    ctx.attributes.set("registration", value);
    Ok("valid")
}

fn register(ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
    let registration = ctx.attributes
                          .get_as::<Registration>("registration")
                          .ok_or_else(|| ActionError::failed("nothing to register"))?;
    log::info!("registered '{}' <{}>", registration.name, registration.email);
    ctx.attributes.set("registeredAs", registration.name);
    Ok(())
}

pub fn registration_actions() -> MethodTable {
    MethodTable::new().method("init", |ctx| {
                          ctx.attributes.set("formVisits", 0);
                          Ok(())
                      })
                      .method("setup", |ctx| {
                          let visits = ctx.attributes.get_as::<u64>("formVisits").unwrap_or(0);
                          ctx.attributes.set("formVisits", visits + 1);
                          Ok(())
                      })
                      .method("hasInput", |ctx| Ok(ctx.payload.is_object()))
                      .method("validate", validate)
                      .method("register", register)
                      .method("finish", |ctx| {
                          ctx.attributes.set("completed", true);
                          Ok(())
                      })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problems_are_listed() {
        let ok = Registration { name: "Ada".into(),
                                email: "ada@example.org".into() };
        assert!(ok.problems().is_empty());
        let bad = Registration { name: " ".into(),
                                 email: "nope".into() };
        assert_eq!(bad.problems().len(), 2);
    }

    #[test]
    fn table_exposes_every_method_of_the_flow() {
        let table = registration_actions();
        for method in ["init", "setup", "hasInput", "validate", "register", "finish"] {
            assert!(table.has_method(method), "{method}");
        }
    }
}
