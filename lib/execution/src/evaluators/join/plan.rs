use rdf_weave_common::{ExecutionResult, SolutionSequence};
use rdf_weave_logical::{AlgebraNode, AlgebraNodeRef, Binding, Expression, Operator};
use rdf_weave_model::{position_of, union_variables, Row, Variable};
use std::sync::Arc;

/// The source of the first frame of a bind join.
#[derive(Debug)]
pub(crate) enum JoinHead {
    /// The first operand is evaluated without any bindings.
    Node(AlgebraNodeRef),
    /// The first frame iterates a constant table.
    Table {
        variables: Arc<[Variable]>,
        rows: Arc<[Row]>,
    },
}

/// An operand after the first one. It is specialized once for every upstream row.
#[derive(Debug)]
pub(crate) struct JoinStep {
    /// The operand that is specialized with the upstream values.
    operand: AlgebraNodeRef,
    /// The upstream variables that are bound into the operand.
    binding_variables: Arc<[Variable]>,
    /// The positions of [Self::binding_variables] in the upstream rows.
    binding_positions: Vec<usize>,
    /// Variables of the operand that already exist upstream, with their upstream position.
    shared: Vec<(Variable, usize)>,
    /// Variables of the operand that are appended to the upstream rows.
    new_variables: Vec<Variable>,
}

impl JoinStep {
    /// Creates a new buffer for the bindings of this step.
    pub(crate) fn binding(&self) -> Binding {
        Binding::new(Arc::clone(&self.binding_variables))
    }

    /// Specializes the operand with the values of `upstream`.
    pub(crate) fn specialize(&self, binding: &mut Binding, upstream: &Row) -> AlgebraNodeRef {
        binding.load(upstream, &self.binding_positions);
        binding.apply(&self.operand)
    }

    /// Returns the number of columns that this step appends.
    pub(crate) fn new_variable_count(&self) -> usize {
        self.new_variables.len()
    }
}

/// Maps the columns of a specialized operand onto the extended upstream row.
///
/// The layout depends on the upstream row, as only bound upstream values are substituted into the
/// operand.
#[derive(Debug, Default)]
pub(crate) struct FrameLayout {
    /// Upstream positions that are unbound upstream and filled from the operand column.
    fill: Vec<(usize, usize)>,
    /// The operand column of each appended variable.
    append: Vec<Option<usize>>,
}

impl FrameLayout {
    /// The layout of the first frame. Every `expected` variable is appended from `columns`.
    pub(crate) fn head(expected: &[Variable], columns: &[Variable]) -> Self {
        Self {
            fill: Vec::new(),
            append: expected.iter().map(|v| position_of(columns, v)).collect(),
        }
    }

    /// Computes the layout of `step` for the `columns` of the specialized operand.
    pub(crate) fn new(step: &JoinStep, upstream: &Row, columns: &[Variable]) -> Self {
        let fill = step
            .shared
            .iter()
            .filter(|(_, position)| upstream.get(*position).is_none())
            .filter_map(|(variable, position)| {
                position_of(columns, variable).map(|column| (*position, column))
            })
            .collect();
        let append = step
            .new_variables
            .iter()
            .map(|v| position_of(columns, v))
            .collect();
        Self { fill, append }
    }

    /// Combines an upstream row with a row of the operand.
    pub(crate) fn combine(&self, upstream: &Row, row: &Row) -> Row {
        let mut terms = upstream.terms().to_vec();
        for (position, column) in &self.fill {
            if let (Some(slot), Some(term)) = (terms.get_mut(*position), row.get(*column)) {
                *slot = Some(term.clone());
            }
        }
        terms.extend(
            self.append
                .iter()
                .map(|column| column.and_then(|c| row.get(c)).cloned()),
        );
        Row::from(terms)
    }
}

/// The execution plan of a bind join.
///
/// Frame 0 evaluates the head. Frame `i > 0` specializes step `i - 1` with every row of frame
/// `i - 1` and extends the row with the new variables of the step.
#[derive(Debug)]
pub(crate) struct JoinPlan {
    head: JoinHead,
    steps: Vec<JoinStep>,
    optional: bool,
    projection: Option<Vec<Option<usize>>>,
}

impl JoinPlan {
    /// Creates a plan that evaluates `operands` in the given order.
    ///
    /// If `optional` is set, upstream rows without any matching row of the last operand are
    /// extended with unbound values. `expression` is an additional condition of the last operand
    /// that can reference upstream variables. `projection` restores the declared variable order.
    pub(crate) fn new(
        head: JoinHead,
        operands: Vec<AlgebraNodeRef>,
        optional: bool,
        expression: Option<&Expression>,
        projection: Option<Vec<usize>>,
    ) -> Self {
        let mut upstream = head.variables().to_vec();
        let last = operands.len().saturating_sub(1);
        let mut steps = Vec::with_capacity(operands.len());
        for (i, operand) in operands.into_iter().enumerate() {
            let expression = expression.filter(|_| i == last);
            let step = create_step(&upstream, operand, expression);
            upstream = union_variables([upstream.as_slice(), step.new_variables.as_slice()]);
            steps.push(step);
        }

        Self {
            head,
            steps,
            optional,
            projection: projection.map(|p| p.into_iter().map(Some).collect()),
        }
    }

    /// Returns the source of frame 0.
    pub(crate) fn head(&self) -> &JoinHead {
        &self.head
    }

    /// Returns the step that frame `depth` evaluates, if `depth > 0`.
    pub(crate) fn step(&self, depth: usize) -> Option<&JoinStep> {
        depth.checked_sub(1).and_then(|i| self.steps.get(i))
    }

    /// Returns the steps of this plan.
    pub(crate) fn steps(&self) -> &[JoinStep] {
        &self.steps
    }

    /// Returns the number of frames.
    pub(crate) fn depth(&self) -> usize {
        self.steps.len() + 1
    }

    /// Returns true if frame `depth` is the optional side of a left join.
    pub(crate) fn is_optional(&self, depth: usize) -> bool {
        self.optional && depth + 1 == self.depth() && depth > 0
    }

    /// Restores the declared variable order of a complete row.
    pub(crate) fn finish(&self, row: Row) -> Row {
        match &self.projection {
            None => row,
            Some(projection) => row.project(projection),
        }
    }
}

impl JoinHead {
    /// Returns the variables of the rows of frame 0.
    pub(crate) fn variables(&self) -> &[Variable] {
        match self {
            JoinHead::Node(node) => node.variables(),
            JoinHead::Table { variables, .. } => variables,
        }
    }

    /// Evaluates the head.
    pub(crate) fn evaluate(
        &self,
        execute: impl FnOnce(&AlgebraNodeRef) -> ExecutionResult<SolutionSequence>,
    ) -> ExecutionResult<SolutionSequence> {
        match self {
            JoinHead::Node(node) => execute(node),
            JoinHead::Table { variables, rows } => Ok(SolutionSequence::from_rows(
                Arc::clone(variables),
                Arc::clone(rows),
            )),
        }
    }
}

fn create_step(
    upstream: &[Variable],
    operand: AlgebraNodeRef,
    expression: Option<&Expression>,
) -> JoinStep {
    let mut bindable = operand.variables().to_vec();
    let operand = match expression {
        None => operand,
        Some(expression) => {
            bindable = union_variables([bindable.as_slice(), expression.variables().as_slice()]);
            AlgebraNode::new(Operator::Filter {
                inner: operand,
                expressions: vec![expression.clone()],
            })
        }
    };

    let (binding_variables, binding_positions): (Vec<_>, Vec<_>) = bindable
        .iter()
        .filter_map(|v| position_of(upstream, v).map(|p| (v.clone(), p)))
        .unzip();
    let shared = operand
        .variables()
        .iter()
        .filter_map(|v| position_of(upstream, v).map(|p| (v.clone(), p)))
        .collect();
    let new_variables = operand
        .variables()
        .iter()
        .filter(|v| position_of(upstream, v).is_none())
        .cloned()
        .collect();

    JoinStep {
        operand,
        binding_variables: binding_variables.into(),
        binding_positions,
        shared,
        new_variables,
    }
}
