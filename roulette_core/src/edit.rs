//! Manual edits of a single condition field.
//!
//! Every setter touches one field of one target and nothing else; rejected
//! edits leave the spin unchanged.

use thiserror::Error;

use crate::catalog::{DisguiseId, MapMethodId, TargetId};
use crate::methods::{KillComplication, KillType, RouletteMethod};
use crate::spin::{Condition, Spin};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("unknown target `{0}`")]
    UnknownTarget(String),
    #[error("target #{0} has no condition in this spin")]
    TargetNotInSpin(TargetId),
    #[error("unknown kill method `{0}`")]
    UnknownMethod(String),
    #[error("`{method}` is not available to `{target}`")]
    MethodNotAvailable { target: String, method: String },
    #[error("`{target}` only accepts its scripted kill methods")]
    StandardOnUnique { target: String },
    #[error("kill type {kill_type} is not legal for `{method}`")]
    IllegalKillType { method: String, kill_type: KillType },
    #[error("unknown kill type `{0}`")]
    UnknownKillType(String),
    #[error("unknown disguise `{0}`")]
    UnknownDisguise(String),
}

impl Spin {
    /// Resolve a target by keyword or full name.
    pub fn resolve_target(&self, name: &str) -> Result<TargetId, EditError> {
        let target = self
            .mission()
            .find_target(name)
            .ok_or_else(|| EditError::UnknownTarget(name.trim().to_string()))?;
        if self.condition(target).is_none() {
            return Err(EditError::TargetNotInSpin(target));
        }
        Ok(target)
    }

    /// Assign a standard or firearm method.
    pub fn set_standard_method(
        &mut self,
        target: TargetId,
        method: RouletteMethod,
    ) -> Result<(), EditError> {
        let mission = self.mission().clone();
        let entry = mission
            .target(target)
            .ok_or_else(|| EditError::UnknownTarget(target.to_string()))?;
        if entry.is_unique() {
            return Err(EditError::StandardOnUnique {
                target: entry.name.clone(),
            });
        }
        if matches!(method, RouletteMethod::Map(_)) {
            return Err(EditError::MethodNotAvailable {
                target: entry.name.clone(),
                method: mission.method_name(method).to_string(),
            });
        }
        self.replace_method(target, method)
    }

    /// Assign one of the target's own mission-specific methods.
    pub fn set_map_method(&mut self, target: TargetId, method: MapMethodId) -> Result<(), EditError> {
        let mission = self.mission().clone();
        let entry = mission
            .target(target)
            .ok_or_else(|| EditError::UnknownTarget(target.to_string()))?;
        if !entry.map_methods().contains(&method) {
            let method = mission
                .map_method(method)
                .map(|method| method.name.clone())
                .unwrap_or_else(|| format!("map method #{method}"));
            return Err(EditError::MethodNotAvailable {
                target: entry.name.clone(),
                method,
            });
        }
        self.replace_method(target, RouletteMethod::Map(method))
    }

    pub fn set_method(&mut self, target: TargetId, method: RouletteMethod) -> Result<(), EditError> {
        match method {
            RouletteMethod::Map(id) => self.set_map_method(target, id),
            other => self.set_standard_method(target, other),
        }
    }

    pub fn set_method_by_name(&mut self, target: TargetId, name: &str) -> Result<(), EditError> {
        let mission = self.mission().clone();
        match mission.find_method(target, name) {
            Some(method) => self.set_method(target, method),
            None => match mission.find_any_method(name) {
                Some(method) => self.set_method(target, method),
                None => Err(EditError::UnknownMethod(name.trim().to_string())),
            },
        }
    }

    pub fn set_kill_type(&mut self, target: TargetId, kill_type: KillType) -> Result<(), EditError> {
        let mission = self.mission().clone();
        let condition = self.editable(target)?;
        let class = mission.method_class(condition.method);
        if !class.allows(kill_type) {
            return Err(EditError::IllegalKillType {
                method: mission.method_name(condition.method).to_string(),
                kill_type,
            });
        }
        condition.kill_type = kill_type;
        Ok(())
    }

    pub fn set_kill_type_by_code(&mut self, target: TargetId, code: &str) -> Result<(), EditError> {
        let kill_type =
            KillType::from_code(code).ok_or_else(|| EditError::UnknownKillType(code.to_string()))?;
        self.set_kill_type(target, kill_type)
    }

    pub fn set_disguise(&mut self, target: TargetId, disguise: DisguiseId) -> Result<(), EditError> {
        if self.mission().disguise(disguise).is_none() {
            return Err(EditError::UnknownDisguise(format!("#{disguise}")));
        }
        self.editable(target)?.disguise = disguise;
        Ok(())
    }

    pub fn set_disguise_by_name(&mut self, target: TargetId, name: &str) -> Result<(), EditError> {
        let disguise = self
            .mission()
            .find_disguise(name)
            .ok_or_else(|| EditError::UnknownDisguise(name.trim().to_string()))?;
        self.set_disguise(target, disguise)
    }

    pub fn set_complication(
        &mut self,
        target: TargetId,
        complication: KillComplication,
    ) -> Result<(), EditError> {
        self.editable(target)?.complication = complication;
        Ok(())
    }

    /// Swap the method, keeping the kill type only while the new class still
    /// allows it. Otherwise the class's first legal kill type is taken, or
    /// `Any` for classes without variance.
    fn replace_method(&mut self, target: TargetId, method: RouletteMethod) -> Result<(), EditError> {
        let class = self.mission().method_class(method);
        let condition = self.editable(target)?;
        condition.method = method;
        if !class.allows(condition.kill_type) {
            condition.kill_type = class.kill_types().first().copied().unwrap_or(KillType::Any);
        }
        Ok(())
    }

    fn editable(&mut self, target: TargetId) -> Result<&mut Condition, EditError> {
        self.condition_mut(target)
            .ok_or(EditError::TargetNotInSpin(target))
    }
}
