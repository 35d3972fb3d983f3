use pageflow_core::{ActionContext, ActionError, ActionHandler, ActionOutcome};

pub const COUNTER_CLASS: &str = "CounterAction";

/// Atributo donde vive el contador.
pub const COUNTER_ATTRIBUTE: &str = "counter";

/// Handler del flujo `Counter`.
///
/// El paso del incremento se puede pasar en el payload como `{"by": n}`;
/// por defecto es 1.
#[derive(Debug, Default, Clone, Copy)]
pub struct CounterAction;

impl CounterAction {
    fn current(ctx: &ActionContext<'_>) -> i64 {
        ctx.attributes.get_as::<i64>(COUNTER_ATTRIBUTE).unwrap_or(0)
    }

    fn step(ctx: &ActionContext<'_>) -> Result<i64, ActionError> {
        match ctx.payload.get("by") {
            None => Ok(1),
            Some(by) => by.as_i64()
                          .ok_or_else(|| ActionError::failed(format!("'by' must be an integer, got {by}"))),
        }
    }
}

impl ActionHandler for CounterAction {
    fn invoke(&self, method: &str, ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
        match method {
            // Las auto-transiciones vuelven a ejecutar el entry: sólo inicializa.
            "setupCounter" => {
                if !ctx.attributes.has(COUNTER_ATTRIBUTE) {
                    ctx.attributes.set(COUNTER_ATTRIBUTE, 0);
                }
            }
            "increaseCounter" => {
                let next = Self::current(ctx).checked_add(Self::step(ctx)?)
                                             .ok_or_else(|| ActionError::failed("counter overflow"))?;
                ctx.attributes.set(COUNTER_ATTRIBUTE, next);
            }
            "decreaseCounter" => {
                let next = Self::current(ctx).checked_sub(Self::step(ctx)?)
                                             .ok_or_else(|| ActionError::failed("counter underflow"))?;
                ctx.attributes.set(COUNTER_ATTRIBUTE, next);
            }
            "canDecrease" => return Ok(ActionOutcome::Guard(Self::current(ctx) > 0)),
            "finishCounter" => {
                log::info!("flow '{}' finished counting at {}", ctx.flow_id, Self::current(ctx));
            }
            other => return Err(ActionError::UnknownMethod(other.to_string())),
        }
        Ok(ActionOutcome::Done)
    }
}
