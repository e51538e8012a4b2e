//! Statement chains: root resolution, property reads, and dispatch of
//! entity, item and system calls.

use std::collections::VecDeque;

use ss_world::{EntityId, ItemId, SERVER_OWNER};

use crate::chain::{self, Segment};
use crate::context::ScriptContext;
use crate::error::ScriptError;
use crate::instance::{CallRequest, ResumePoint, ScriptInstance};
use crate::loader::ScriptCategory;
use crate::repository::FunctionDescriptor;
use crate::system::{Accessor, Sentinel, SystemCall, SystemFn};
use crate::value::Value;

/// Largest summed tile delta between a caller and an entity it calls.
pub const MAX_CALL_RANGE: i32 = 1;

/// Non-local exits out of line evaluation.
#[derive(Debug)]
pub(crate) enum Flow {
    Error(ScriptError),
    Call(CallRequest),
    Exit(Option<Value>),
}

impl From<ScriptError> for Flow {
    fn from(error: ScriptError) -> Self {
        Self::Error(error)
    }
}

/// Per-line evaluation state.
#[derive(Debug)]
pub(crate) struct LineState<'l> {
    pub(crate) text: &'l str,
    /// Set when a system call asked the instance to stop after this line.
    pub(crate) yield_request: Option<u32>,
}

impl<'l> LineState<'l> {
    pub(crate) fn new(text: &'l str) -> Self {
        Self {
            text,
            yield_request: None,
        }
    }

    fn request_yield(&mut self, cooldown: u32) {
        let merged = self.yield_request.map_or(cooldown, |c| c.max(cooldown));
        self.yield_request = Some(merged);
    }
}

impl ScriptInstance {
    /// Evaluate a parameter or right-hand side: arithmetic over operands, or
    /// a single statement chain.
    pub(crate) fn evaluate_expression(
        &self,
        ctx: &mut ScriptContext<'_>,
        state: &mut LineState<'_>,
        text: &str,
    ) -> Result<Value, Flow> {
        let text = text.trim();
        let Some((op, operands)) = chain::split_arithmetic(text) else {
            return self.evaluate_statement(ctx, state, text, true);
        };

        let mut acc: Option<i64> = None;
        for operand in operands {
            let value = self.evaluate_expression(ctx, state, operand)?;
            let n = value
                .as_int()
                .ok_or_else(|| ScriptError::NotANumber(value.literal()))?;
            acc = Some(match acc {
                None => n,
                Some(a) => arithmetic(op, a, n)?,
            });
        }
        acc.map(Value::Int)
            .ok_or_else(|| ScriptError::EmptyExpression.into())
    }

    /// Evaluate a chain such as `$Entity[2].open(1)` or `_:get(3).Health`.
    /// `want_value` is false only for a bare top-level statement.
    pub(crate) fn evaluate_statement(
        &self,
        ctx: &mut ScriptContext<'_>,
        state: &mut LineState<'_>,
        statement: &str,
        want_value: bool,
    ) -> Result<Value, Flow> {
        let statement = statement.trim();
        let mut segments: VecDeque<Segment> = chain::tokenize(statement).into();
        let Some(root) = segments.pop_front() else {
            return Err(ScriptError::EmptyExpression.into());
        };

        let (mut current, mut accessor) = match root {
            Segment::Accessor(word) => self.resolve_root(ctx, &word)?,
            Segment::Call(text) => {
                let call = Call {
                    text: &text,
                    resume: chain::chain_prefix(statement, 0),
                    wants_value: want_value || !segments.is_empty(),
                };
                let value = self.dispatch(ctx, state, &call, None, &Accessor::None)?;
                (value.clone(), value.map_or(Accessor::None, Accessor::Target))
            }
        };

        let mut index = 0;
        while let Some(segment) = segments.pop_front() {
            index += 1;
            match segment {
                Segment::Accessor(name) => {
                    let value = self.read_property(ctx, current.as_ref(), &name)?;
                    current = Some(value.clone());
                    accessor = Accessor::Target(value);
                }
                Segment::Call(text) => {
                    let call = Call {
                        text: &text,
                        resume: chain::chain_prefix(statement, index),
                        wants_value: want_value || !segments.is_empty(),
                    };
                    current = self.dispatch(ctx, state, &call, current.as_ref(), &accessor)?;
                    accessor = current.clone().map_or(Accessor::None, Accessor::Target);
                }
            }
        }

        Ok(current.unwrap_or_default())
    }

    /// First link of a chain: reserved roots, literals, then variables.
    fn resolve_root(&self, ctx: &ScriptContext<'_>, word: &str) -> Result<(Option<Value>, Accessor), ScriptError> {
        match word {
            "_" => {
                if self.authority != SERVER_OWNER {
                    return Err(ScriptError::Unauthenticated);
                }
                return Ok((None, Accessor::Authority));
            }
            "items" => {
                let has_storage = ctx
                    .world
                    .entity(self.entity)
                    .is_some_and(|e| e.has_storage());
                if !has_storage {
                    return Err(ScriptError::NullReference("items".into()));
                }
                return Ok((None, Accessor::Items));
            }
            _ => {}
        }

        let value = if let Some(value) = Value::parse_literal(word) {
            let exists = match &value {
                Value::Entity(id) => ctx.world.entity(*id).is_some(),
                Value::Item(id) => ctx.world.item(*id).is_some(),
                _ => true,
            };
            if !exists {
                return Err(ScriptError::NullReference(word.to_string()));
            }
            value
        } else if let Some(value) = self.variables.get(word) {
            tracing::debug!(instance = %self.id, "{word} => {}", value.literal());
            value.clone()
        } else {
            return Err(ScriptError::NullReference(word.to_string()));
        };
        Ok((Some(value.clone()), Accessor::Target(value)))
    }

    /// `target.name`: integer variable of an entity.
    fn read_property(&self, ctx: &ScriptContext<'_>, target: Option<&Value>, name: &str) -> Result<Value, ScriptError> {
        let missing = || {
            let owner = target.map_or_else(|| "NULL".to_string(), Value::literal);
            ScriptError::NullReference(format!("{owner}.{name}"))
        };
        let Some(Value::Entity(id)) = target else {
            return Err(missing());
        };
        ctx.world
            .entity(*id)
            .and_then(|e| e.variable(name))
            .map(Value::Int)
            .ok_or_else(missing)
    }

    /// Resolve and run one call segment. Entity and item functions always
    /// suspend the line through [`Flow::Call`].
    fn dispatch(
        &self,
        ctx: &mut ScriptContext<'_>,
        state: &mut LineState<'_>,
        call: &Call<'_>,
        target: Option<&Value>,
        accessor: &Accessor,
    ) -> Result<Option<Value>, Flow> {
        let (name, raw) = chain::split_call(call.text)
            .ok_or_else(|| ScriptError::MalformedCall(call.text.to_string()))?;
        let params = chain::split_params(raw)
            .into_iter()
            .map(|p| self.evaluate_expression(ctx, state, p))
            .collect::<Result<Vec<_>, _>>()?;

        let repository = ctx.repository;
        let systems = ctx.systems;
        match target {
            Some(Value::Entity(id)) => {
                if let Some(function) = ctx
                    .registry
                    .resolve_entity_function(ctx.world, repository, *id, name)
                {
                    let request = self.entity_call(ctx, state, call, *id, function, params)?;
                    return Err(Flow::Call(request));
                }
            }
            Some(Value::Item(id)) => {
                if let Some(function) = ctx
                    .registry
                    .resolve_item_function(ctx.world, repository, *id, name)
                {
                    let request = self.item_call(ctx, state, call, *id, function, params)?;
                    return Err(Flow::Call(request));
                }
            }
            _ => {}
        }

        if let Some(function) = systems.get(name) {
            return self.system_call(ctx, state, name, function, accessor, &params);
        }

        let owner = match target {
            Some(Value::Entity(id)) => ctx.world.entity_type_of(*id).map(|t| t.name.clone()),
            Some(Value::Item(id)) => ctx.world.item_type_of(*id).map(|t| t.name.clone()),
            _ => None,
        };
        let owner = owner.unwrap_or_else(|| "NULL".to_string());
        Err(ScriptError::UnknownFunction(format!("{owner}:{name}")).into())
    }

    fn entity_call(
        &self,
        ctx: &ScriptContext<'_>,
        state: &LineState<'_>,
        call: &Call<'_>,
        target: EntityId,
        function: &FunctionDescriptor,
        params: Vec<Value>,
    ) -> Result<CallRequest, ScriptError> {
        check_arity(function, params.len())?;

        let caller = ctx
            .world
            .entity(self.entity)
            .ok_or_else(|| ScriptError::NullReference(format!("$Entity[{}]", self.entity)))?;
        let callee = ctx
            .world
            .entity(target)
            .ok_or_else(|| ScriptError::NullReference(format!("$Entity[{target}]")))?;

        let distance = caller.pos.summed_delta(callee.pos);
        if distance > MAX_CALL_RANGE {
            return Err(ScriptError::OutOfRange {
                distance,
                max: MAX_CALL_RANGE,
            });
        }
        if caller.pos.step(caller.direction) != callee.pos {
            return Err(ScriptError::NotFacing);
        }

        tracing::info!(
            instance = %self.id,
            "calling {}() on $Entity[{target}]",
            function.script_name()
        );
        let mut seeds = vec![("_entity".to_string(), Value::Entity(self.entity))];
        seeds.extend(param_seeds(params));
        Ok(CallRequest {
            host: target,
            authority: callee.owner_id,
            category: ScriptCategory::Entity,
            script: function.script_name(),
            seeds,
            resume: call.resume_point(state),
        })
    }

    fn item_call(
        &self,
        ctx: &ScriptContext<'_>,
        state: &LineState<'_>,
        call: &Call<'_>,
        item: ItemId,
        function: &FunctionDescriptor,
        params: Vec<Value>,
    ) -> Result<CallRequest, ScriptError> {
        check_arity(function, params.len())?;

        let caller = ctx
            .world
            .entity(self.entity)
            .ok_or_else(|| ScriptError::NullReference(format!("$Entity[{}]", self.entity)))?;
        if !caller.holds(item) {
            return Err(ScriptError::ItemNotHeld(item));
        }

        tracing::info!(
            instance = %self.id,
            "calling {}() on $Item[{item}]",
            function.script_name()
        );
        let mut seeds = vec![
            ("_entity".to_string(), Value::Entity(self.entity)),
            ("_item".to_string(), Value::Item(item)),
        ];
        seeds.extend(param_seeds(params));
        Ok(CallRequest {
            host: self.entity,
            authority: caller.owner_id,
            category: ScriptCategory::Item,
            script: function.script_name(),
            seeds,
            resume: call.resume_point(state),
        })
    }

    fn system_call(
        &self,
        ctx: &mut ScriptContext<'_>,
        state: &mut LineState<'_>,
        name: &str,
        function: &SystemFn,
        accessor: &Accessor,
        params: &[Value],
    ) -> Result<Option<Value>, Flow> {
        let mut call = SystemCall {
            world: &mut *ctx.world,
            entity: self.entity,
            authority: self.authority,
            accessor,
            params,
        };
        let ret = function(&mut call);

        if let Some(sentinel) = ret.data.as_deref().and_then(Sentinel::decode) {
            return Err(sentinel.into_error(accessor, name, params.len()).into());
        }
        let value = ret.data.as_deref().map(Value::from_data);
        if ret.exit {
            return Err(Flow::Exit(value));
        }
        if ret.tick_cooldown != 0 {
            state.request_yield(ret.tick_cooldown.max(0).unsigned_abs());
        }
        Ok(value)
    }
}

/// One call segment being dispatched.
struct Call<'s> {
    /// `name(args)` text.
    text: &'s str,
    /// Chain text up to and including this call; replaced on resume.
    resume: &'s str,
    wants_value: bool,
}

impl Call<'_> {
    fn resume_point(&self, state: &LineState<'_>) -> Option<ResumePoint> {
        self.wants_value.then(|| ResumePoint {
            line: state.text.to_string(),
            statement: self.resume.to_string(),
        })
    }
}

fn check_arity(function: &FunctionDescriptor, got: usize) -> Result<(), ScriptError> {
    if !function.is_defined() {
        return Err(ScriptError::UndefinedFunction(function.script_name()));
    }
    let expected = function.parameter_count.unsigned_abs() as usize;
    if got != expected {
        return Err(ScriptError::Arity {
            function: function.name.clone(),
            expected,
            got,
        });
    }
    Ok(())
}

fn param_seeds(params: Vec<Value>) -> impl Iterator<Item = (String, Value)> {
    params
        .into_iter()
        .enumerate()
        .map(|(i, v)| (format!("_param{i}"), v))
}

fn arithmetic(op: char, a: i64, b: i64) -> Result<i64, ScriptError> {
    let result = match op {
        '+' => a.checked_add(b),
        '-' => a.checked_sub(b),
        '*' => a.checked_mul(b),
        '/' => a.checked_div(b),
        _ => None,
    };
    result.ok_or_else(|| ScriptError::Arithmetic(format!("{a} {op} {b}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_is_checked() {
        assert_eq!(arithmetic('+', 2, 3), Ok(5));
        assert_eq!(arithmetic('/', 7, 2), Ok(3));
        assert_eq!(arithmetic('/', -7, 2), Ok(-3));
        assert!(arithmetic('/', 1, 0).is_err());
        assert!(arithmetic('*', i64::MAX, 2).is_err());
    }

    #[test]
    fn yield_requests_merge_to_longest() {
        let mut state = LineState::new("x");
        state.request_yield(0);
        state.request_yield(5);
        state.request_yield(2);
        assert_eq!(state.yield_request, Some(5));
    }
}
