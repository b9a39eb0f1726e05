//! Group flattening.

use super::stage::StageInput;

/// Splices nested groups into one ordered sequence.
///
/// Depth-first, left to right. Empty groups contribute nothing. `Absent`
/// and `Unsupported` entries keep their position; the composer skips them.
pub fn flatten<C>(inputs: Vec<StageInput<C>>) -> Vec<StageInput<C>> {
    let mut flat = Vec::with_capacity(inputs.len());
    splice(inputs, &mut flat);
    flat
}

fn splice<C>(inputs: Vec<StageInput<C>>, out: &mut Vec<StageInput<C>>) {
    for input in inputs {
        match input {
            StageInput::Group(group) => splice(group, out),
            leaf => out.push(leaf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Request, Response};

    fn a(_req: &Request, _res: &mut Response) {}

    fn shape(inputs: &[StageInput]) -> Vec<String> {
        inputs.iter().map(|i| format!("{i:?}")).collect()
    }

    #[test]
    fn nested_groups_are_spliced_in_place() {
        let flat: Vec<StageInput> = flatten(vec![
            StageInput::Absent,
            StageInput::group([
                StageInput::action(a),
                StageInput::group([StageInput::wrap(crate::Wrapper::new(|n| n))]),
            ]),
            StageInput::lazy(|| a),
        ]);
        assert_eq!(
            shape(&flat),
            ["Absent", "Stage::action", "Stage::wrapper", "Stage::lazy"],
        );
    }

    #[test]
    fn empty_groups_contribute_nothing() {
        let flat: Vec<StageInput> = flatten(vec![
            StageInput::group([]),
            StageInput::group([StageInput::group([])]),
            StageInput::action(a),
        ]);
        assert_eq!(shape(&flat), ["Stage::action"]);
    }

    #[test]
    fn no_inputs_flatten_to_nothing() {
        assert!(flatten::<()>(Vec::new()).is_empty());
    }
}
