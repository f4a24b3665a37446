use crate::config::PIPE_TOKEN;
use crate::model::{Entity, EntityKind, IfcModel};
use std::collections::HashMap;

/// Component name → GlobalId.
pub type ComponentIndex = HashMap<String, String>;

/// Element assemblies whose name contains `PIPE`, case-insensitively, in
/// model order.
#[must_use]
pub fn find_pipe_assemblies(model: &IfcModel) -> Vec<&Entity> {
    model
        .entities_of_kind(EntityKind::Assembly)
        .filter(|e| {
            e.name()
                .is_some_and(|name| name.to_uppercase().contains(PIPE_TOKEN))
        })
        .collect()
}

/// Indexes the assemblies directly decomposing each pipe by name.
///
/// A name seen under several pipes keeps the last GlobalId encountered.
/// Unnamed components cannot be matched against a sheet row and are left out.
#[must_use]
pub fn index_components(model: &IfcModel, pipes: &[&Entity]) -> ComponentIndex {
    let mut index = ComponentIndex::new();

    for pipe in pipes {
        for &child in model.children(pipe.id()) {
            let Some(component) = model.entity(child) else {
                continue;
            };
            if component.kind() != EntityKind::Assembly {
                continue;
            }
            if let (Some(name), Some(global_id)) = (component.name(), component.global_id()) {
                index.insert(name.to_string(), global_id.to_string());
            }
        }
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::StepFile;
    use pretty_assertions::assert_eq;

    const MODEL: &str = "ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCELEMENTASSEMBLY('1kTvXnbbzCWw8lcMd1dR4o',$,'/Pipe-A',$,$,$,$,$,$,$);
#2=IFCELEMENTASSEMBLY('2Vh2uG3ET4lf1SJTwBW0zV',$,'/PIPE-B',$,$,$,$,$,$,$);
#3=IFCELEMENTASSEMBLY('0K6MU3uWr7EOoSBKTyWcOc',$,'ELBOW 1',$,$,$,$,$,$,$);
#4=IFCELEMENTASSEMBLY('3gD7yL9sr0$Oyf2nKMpX1W',$,'ELBOW 1',$,$,$,$,$,$,$);
#5=IFCPIPEFITTING('1Xa2ZP_Pr4HuS6KfVN9tWd',$,'FLANGE',$,$,$,$,$,$);
#6=IFCELEMENTASSEMBLY('2qy2Wd0Ln1UR2kDvyJBlR8',$,'STRUCTURE',$,$,$,$,$,$,$);
#7=IFCRELAGGREGATES('0u4wgLe6n0ABVaiXyikbkA',$,$,$,#1,(#3,#5));
#8=IFCRELAGGREGATES('1hqIFTRjfV6AWq_bMtnZwI',$,$,$,#2,(#4));
ENDSEC;
END-ISO-10303-21;
";

    fn model() -> IfcModel {
        IfcModel::from_step(StepFile::parse(MODEL).unwrap())
    }

    #[test]
    fn finds_pipes_case_insensitively() {
        let model = model();
        let names: Vec<_> = find_pipe_assemblies(&model)
            .iter()
            .filter_map(|e| e.name())
            .collect();
        assert_eq!(names, vec!["/Pipe-A", "/PIPE-B"]);
    }

    #[test]
    fn indexes_only_assembly_children() {
        let model = model();
        let pipes = find_pipe_assemblies(&model);
        let index = index_components(&model, &pipes[..1]);

        assert_eq!(index.len(), 1);
        assert_eq!(
            index.get("ELBOW 1").map(String::as_str),
            Some("0K6MU3uWr7EOoSBKTyWcOc")
        );
    }

    #[test]
    fn later_pipe_wins_on_name_collision() {
        let model = model();
        let pipes = find_pipe_assemblies(&model);
        let index = index_components(&model, &pipes);

        assert_eq!(
            index.get("ELBOW 1").map(String::as_str),
            Some("3gD7yL9sr0$Oyf2nKMpX1W")
        );
    }
}
