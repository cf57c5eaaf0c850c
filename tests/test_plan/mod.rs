use std::cell::RefCell;
use std::error::Error;
use std::fs;
use std::io;
use std::path::Path;
use std::rc::Rc;

use palaver::*;

#[derive(Debug, PartialEq, Eq)]
pub enum PlanStep {
    Line(String),
    Option(String),
    Select(usize),
    Call(String),
    Stop,
}

impl PlanStep {
    fn new(line: &str) -> Self {
        let mut split_line = line.splitn(2, ": ");
        match split_line.next() {
            Some("line") => Self::Line(split_line.next().unwrap().to_owned()),
            Some("option") => Self::Option(split_line.next().unwrap().to_owned()),
            Some("select") => {
                let index: usize = split_line.next().and_then(|s| s.parse().ok()).unwrap();
                if index < 1 {
                    panic!("Select index must be 1 or greater.");
                }
                Self::Select(index - 1)
            }
            Some("call") => Self::Call(split_line.next().unwrap().to_owned()),
            Some("stop") => Self::Stop,
            Some(step) => panic!(
                "Could not parse test plan step \"{}\" in line \"{}\"",
                step, line
            ),
            None => panic!("Could not parse test plan step in line \"{}\"", line),
        }
    }
}

pub struct TestPlan {
    steps: Vec<PlanStep>,
    next_step_index: usize,
    options: Vec<String>,
}

impl TestPlan {
    pub fn load(plan_path: &Path) -> io::Result<Self> {
        let plan_text = fs::read_to_string(plan_path)?;
        let steps: Vec<_> = plan_text
            .lines()
            .map(|line| line.trim_start())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(PlanStep::new)
            .collect();

        Ok(Self {
            steps,
            next_step_index: 0,
            options: Vec::new(),
        })
    }

    /// Moves to the next step that expects a line, a selection, a call or
    /// the end, collecting the options listed on the way.
    pub fn next(&mut self) {
        let prev_step = match self.next_step_index {
            i if i > 0 && i <= self.steps.len() => Some(&self.steps[i - 1]),
            _ => None,
        };
        if let Some(PlanStep::Select(_)) = prev_step {
            self.options.clear();
        }

        while self.next_step_index <= self.steps.len() {
            let current_step = self.steps.get(self.next_step_index);
            self.next_step_index += 1;

            match current_step {
                Some(PlanStep::Option(option)) => self.options.push(option.clone()),
                _ => return,
            }
        }
    }

    pub fn get_current_step(&self) -> Option<&PlanStep> {
        match self.next_step_index {
            0 => None,
            i if i <= self.steps.len() => Some(&self.steps[i - 1]),
            _ => Some(&PlanStep::Stop),
        }
    }
}

type CallLog = Rc<RefCell<Vec<String>>>;

fn record(log: &CallLog, name: &str, params: &[String]) {
    log.borrow_mut()
        .push(format!("{}({})", name, params.join(", ")));
}

/// Plays a `.ds` script against the `.testplan` next to it.
///
/// Every function the script calls is recorded so the plan can expect it.
/// `disable_line(id)` and `disable_option(id)` also switch the line or option
/// with that id off.
pub struct PlanRunner {
    sequence: Sequence,
    plan: TestPlan,
    calls: CallLog,
}

impl PlanRunner {
    pub fn new(script_path: &str) -> Self {
        let script_path = Path::new(script_path);

        let source = fs::read_to_string(script_path).unwrap();
        let graph = parse_str(&source).unwrap();
        let names: Vec<String> = graph
            .function_names()
            .into_iter()
            .map(str::to_owned)
            .collect();

        let calls = CallLog::default();
        let mut sequence = Sequence::new(graph);

        let log = Rc::clone(&calls);
        sequence
            .register_function(
                "disable_line",
                FunctionInfo::new_contextual(Arity::Exact(1), move |context, params| {
                    record(&log, "disable_line", params);
                    context.toggle_line(&params[0], false)?;
                    Ok(())
                }),
            )
            .unwrap();
        let log = Rc::clone(&calls);
        sequence
            .register_function(
                "disable_option",
                FunctionInfo::new_contextual(Arity::Exact(1), move |context, params| {
                    record(&log, "disable_option", params);
                    context.toggle_option(&params[0], false)?;
                    Ok(())
                }),
            )
            .unwrap();

        for name in names {
            if sequence.library().contains(&name) {
                continue;
            }
            let log = Rc::clone(&calls);
            let label = name.clone();
            sequence
                .register_function(
                    &name,
                    FunctionInfo::new(Arity::Variadic, move |params: &[String]| {
                        record(&log, &label, params)
                    }),
                )
                .unwrap();
        }

        let plan_path = script_path.with_extension("testplan");
        let plan = TestPlan::load(&plan_path).unwrap();

        Self {
            sequence,
            plan,
            calls,
        }
    }

    /// Checks the calls made since the last suspension against the plan.
    fn expect_calls(&mut self) {
        let calls: Vec<String> = self.calls.borrow_mut().drain(..).collect();
        for call in calls {
            self.plan.next();
            let plan_step = self.plan.get_current_step().unwrap();
            assert!(
                matches!(plan_step, PlanStep::Call(plan_call) if *plan_call == call),
                "[{}] Expected the call {:?}, got \"{}\"",
                self.plan.next_step_index,
                plan_step,
                call
            );
        }
    }

    pub fn run(&mut self) -> Result<(), Box<dyn Error>> {
        let mut reason = self.sequence.start()?;

        loop {
            self.expect_calls();

            reason = match reason {
                SuspendReason::Line(line) => {
                    // Assert that the test plan expects this line.
                    self.plan.next();
                    let plan_step = self.plan.get_current_step().unwrap();
                    let line_text = if line.speaker.is_empty() {
                        line.text.clone()
                    } else {
                        format!("{}: {}", line.speaker, line.text)
                    };
                    assert!(
                        matches!(plan_step, PlanStep::Line(plan_text) if *plan_text == line_text),
                        "[{}] Expected the line {:?}, got \"{}\"",
                        self.plan.next_step_index,
                        plan_step,
                        line_text
                    );
                    self.sequence.continue_dialogue()?
                }
                SuspendReason::Options(options) => {
                    // Assert that the test plan expects these options.
                    self.plan.next();
                    let enabled: Vec<_> = options.enabled_options().collect();
                    let texts: Vec<_> = enabled.iter().map(|(_, option)| &option.text).collect();
                    assert_eq!(texts, self.plan.options.iter().collect::<Vec<_>>());

                    match self.plan.get_current_step().unwrap() {
                        PlanStep::Select(i) => {
                            let (id, _) = enabled[*i];
                            self.sequence.select_option(id)?
                        }
                        step => panic!("Expected PlanStep::Select, got {:?}", step),
                    }
                }
                SuspendReason::DialogueComplete => {
                    // Assert that the test plan expects the end of dialogue.
                    self.plan.next();
                    let plan_step = self.plan.get_current_step().unwrap();
                    assert_eq!(*plan_step, PlanStep::Stop);
                    break;
                }
            };
        }

        assert_eq!(self.sequence.execution_state(), ExecutionState::Ended);
        Ok(())
    }
}
