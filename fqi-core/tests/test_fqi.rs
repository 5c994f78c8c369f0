use anyhow::Result;
use fqi_core::{
    dummy::{FailingRegressor, FnRegressor, LookupRegressor},
    record::BufferedRecorder,
    BatchInput, FeatureTransform, FitOptions, Fqi, FqiConfig, FqiError, Policy, QRegressor,
    Trainer, TrainerConfig, TransitionBatch,
};
use ndarray::{array, s, Array1, Array2, ArrayView2};

const DISCOUNT_FACTOR: f64 = 0.9;
const EPS: f32 = 1e-5;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config() -> FqiConfig {
    FqiConfig::default()
        .state_dim(1)
        .action_dim(1)
        .discrete_actions(vec![-1.0f32, 1.0])
        .discount_factor(DISCOUNT_FACTOR)
}

/// `[s, a, s', absorbing]` rows; the second transition is absorbing.
fn batch() -> TransitionBatch {
    TransitionBatch::new(
        array![
            [0.0f32, -1.0, 1.0, 0.0],
            [1.0, 1.0, 2.0, 1.0],
            [2.0, -1.0, 0.0, 0.0]
        ],
        array![1.0f32, 0.0, -1.0],
    )
}

fn lookup_fqi() -> Result<Fqi> {
    Fqi::build(config(), QRegressor::simple(LookupRegressor::new()))
}

fn kind(err: &anyhow::Error) -> Option<&FqiError> {
    err.downcast_ref::<FqiError>()
}

fn assert_close(a: &Array1<f32>, b: &Array1<f32>) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() < EPS, "{} != {}", a, b);
    }
}

#[test]
fn test_first_two_iterations() -> Result<()> {
    init_logger();
    let mut fqi = lookup_fqi()?;
    let opts = FitOptions::default();

    let record = fqi.fit(batch(), &opts)?;
    assert_eq!(fqi.iteration(), 1);
    assert_eq!(fqi.targets().unwrap(), array![1.0f32, 0.0, -1.0]);
    assert_eq!(record.get_scalar("iteration")?, 1.0);
    assert_eq!(record.get_scalar("n_keys")?, 3.0);
    assert_eq!(record.get_array1("targets")?, vec![1.0f32, 0.0, -1.0]);
    assert_eq!(record.get_string("input")?, "fit");
    assert!(record.get("target_delta").is_none());

    let record = fqi.partial_fit(BatchInput::UseCached, &opts)?;
    assert_eq!(fqi.iteration(), 2);
    assert_close(&fqi.targets().unwrap().to_owned(), &array![1.0f32, 0.0, -0.1]);
    assert_eq!(record.get_scalar("iteration")?, 2.0);
    assert_eq!(record.get_string("input")?, "use_cached");
    assert!((record.get_scalar("target_delta")? - 0.9).abs() < EPS);
    assert_eq!(fqi.last_target_delta(), Some(record.get_scalar("target_delta")?));
    Ok(())
}

#[test]
fn test_not_fitted() -> Result<()> {
    let mut fqi = lookup_fqi()?;
    let states = array![[0.0f32]];
    let absorbing = array![0.0f32];

    let err = fqi.max_qa(states.view(), absorbing.view(), false).err().unwrap();
    assert!(matches!(kind(&err), Some(FqiError::NotFittedError(_))));
    let err = fqi.sample(states.view(), absorbing.view()).err().unwrap();
    assert!(matches!(kind(&err), Some(FqiError::NotFittedError(_))));
    let err = fqi
        .partial_fit(BatchInput::UseCached, &FitOptions::default())
        .err()
        .unwrap();
    assert!(matches!(kind(&err), Some(FqiError::NotFittedError(_))));

    fqi.fit(batch(), &FitOptions::default())?;
    fqi.max_qa(states.view(), absorbing.view(), false)?;

    fqi.reset();
    assert_eq!(fqi.iteration(), 0);
    assert!(fqi.cached().is_none());
    let err = fqi.draw_action(states.view(), absorbing.view(), false).err().unwrap();
    assert!(matches!(kind(&err), Some(FqiError::NotFittedError(_))));
    Ok(())
}

#[test]
fn test_partial_fit_new_batch_on_untrained_engine() -> Result<()> {
    let mut fqi = lookup_fqi()?;
    fqi.partial_fit(BatchInput::NewBatch(batch()), &FitOptions::default())?;
    assert_eq!(fqi.iteration(), 1);
    assert_eq!(fqi.targets().unwrap(), array![1.0f32, 0.0, -1.0]);
    Ok(())
}

#[test]
fn test_iteration_is_monotone_and_fit_restarts() -> Result<()> {
    let mut fqi = lookup_fqi()?;
    let opts = FitOptions::default();
    fqi.fit(batch(), &opts)?;
    for k in 2..6 {
        fqi.partial_fit(BatchInput::UseCached, &opts)?;
        assert_eq!(fqi.iteration(), k);
    }
    fqi.fit(batch(), &opts)?;
    assert_eq!(fqi.iteration(), 1);
    Ok(())
}

#[test]
fn test_cached_batch_equals_new_batch() -> Result<()> {
    let opts = FitOptions::default();
    let mut fqi1 = lookup_fqi()?;
    let mut fqi2 = lookup_fqi()?;
    fqi1.fit(batch(), &opts)?;
    fqi2.fit(batch(), &opts)?;

    fqi1.partial_fit(BatchInput::UseCached, &opts)?;
    fqi2.partial_fit(BatchInput::NewBatch(batch()), &opts)?;
    assert_eq!(fqi1.targets(), fqi2.targets());
    Ok(())
}

#[test]
fn test_new_reward() -> Result<()> {
    let opts = FitOptions::default();
    let mut fqi = lookup_fqi()?;
    fqi.fit(batch(), &opts)?;
    fqi.partial_fit(BatchInput::NewReward(array![0.0f32, 0.0, 0.0]), &opts)?;

    // max_a Q(0, a) = Q(0, -1) = 1 after the 1st iteration
    assert_eq!(fqi.iteration(), 2);
    assert_close(&fqi.targets().unwrap().to_owned(), &array![0.0f32, 0.0, 0.9]);
    assert_eq!(fqi.cached().unwrap().reward(), array![0.0f32, 0.0, 0.0]);
    Ok(())
}

#[test]
fn test_absorbing_states_have_zero_value() -> Result<()> {
    let mut fqi = Fqi::build(config(), QRegressor::simple(FnRegressor::new(|_| 5.0)))?;
    fqi.fit(batch(), &FitOptions::default())?;

    let states = array![[0.0f32], [1.0], [2.0]];
    let (max_q, max_action) = fqi.max_qa(states.view(), array![0.0f32, 1.0, 0.0].view(), false)?;
    assert_eq!(max_q, array![5.0f32, 0.0, 5.0]);
    assert_eq!(max_action[[1, 0]], -1.0);
    Ok(())
}

#[test]
fn test_ties_go_to_lowest_index() -> Result<()> {
    let mut fqi = lookup_fqi()?;
    fqi.fit(batch(), &FitOptions::default())?;

    // Neither (5, -1) nor (5, 1) has been seen, both values are 0
    let states = array![[5.0f32], [0.0]];
    let (max_q, max_action) = fqi.max_qa(states.view(), array![0.0f32, 0.0].view(), false)?;
    assert_eq!(max_q, array![0.0f32, 1.0]);
    assert_eq!(max_action, array![[-1.0f32], [-1.0]]);
    Ok(())
}

#[test]
fn test_max_action_is_a_member_of_the_action_set() -> Result<()> {
    let config = FqiConfig::default()
        .state_dim(1)
        .action_dim(2)
        .discrete_actions(vec![vec![0.0f32, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]]);
    // Q(s, a) = s * a0 - a1
    let regressor = FnRegressor::new(|row| row[0] * row[1] - row[2]);
    let mut fqi = Fqi::build(config, QRegressor::simple(regressor))?;
    let batch = TransitionBatch::new(array![[0.0f32, 1.0, 0.0, 1.0, 0.0]], array![0.0f32]);
    fqi.fit(batch, &FitOptions::default())?;

    let states = array![[2.0f32], [-2.0]];
    let actions = fqi.draw_action(states.view(), Array1::zeros(2).view(), false)?;
    assert_eq!(actions, array![[1.0f32, 0.0], [0.0, 1.0]]);
    for a in actions.outer_iter() {
        assert!(fqi.actions().index_of(a).is_some());
    }
    Ok(())
}

#[test]
fn test_shape_errors() -> Result<()> {
    let config = config().state_dim(2);
    let mut fqi = Fqi::build(config, QRegressor::simple(LookupRegressor::new()))?;

    // Rows of a state_dim = 1 batch
    let err = fqi.fit(batch(), &FitOptions::default()).err().unwrap();
    assert!(matches!(kind(&err), Some(FqiError::ShapeError(_))));

    let batch = TransitionBatch::new(array![[0.0f32, 0.0, 1.0, 1.0, 1.0, 0.0]], array![1.0f32]);
    fqi.fit(batch, &FitOptions::default())?;

    let states = Array2::<f32>::zeros((4, 3));
    let err = fqi.max_qa(states.view(), Array1::zeros(4).view(), false).err().unwrap();
    assert!(matches!(kind(&err), Some(FqiError::ShapeError(_))));

    let states = Array2::<f32>::zeros((4, 2));
    let err = fqi.max_qa(states.view(), Array1::zeros(3).view(), false).err().unwrap();
    assert!(matches!(kind(&err), Some(FqiError::ShapeError(_))));
    Ok(())
}

#[test]
fn test_config_errors() {
    let cases = vec![
        config().discrete_actions(vec![1.0f32]),
        config().discrete_actions(vec![1.0f32, 1.0]),
        config().state_dim(0),
        config().discount_factor(1.5),
        config().discount_factor(-0.1),
    ];
    for config in cases {
        let err = Fqi::build(config, QRegressor::simple(LookupRegressor::new()))
            .err()
            .unwrap();
        assert!(matches!(kind(&err), Some(FqiError::ConfigError(_))));
    }
}

#[test]
fn test_failed_partial_fit_keeps_state() -> Result<()> {
    let opts = FitOptions::default();
    let mut fqi = lookup_fqi()?;
    fqi.fit(batch(), &opts)?;
    fqi.partial_fit(BatchInput::UseCached, &opts)?;
    let targets = fqi.targets().unwrap().to_owned();
    let delta = fqi.last_target_delta();

    let bad = TransitionBatch::new(array![[0.0f32, 1.0, 0.0]], array![0.0f32]);
    assert!(fqi.partial_fit(BatchInput::NewBatch(bad), &opts).is_err());
    let err = fqi
        .partial_fit(BatchInput::NewReward(array![1.0f32]), &opts)
        .err()
        .unwrap();
    assert!(matches!(kind(&err), Some(FqiError::ShapeError(_))));

    assert_eq!(fqi.iteration(), 2);
    assert_eq!(fqi.targets().unwrap(), targets);
    assert_eq!(fqi.last_target_delta(), delta);
    assert_eq!(fqi.cached().unwrap().len(), 3);
    Ok(())
}

/// State of an engine that a failed call must not change.
#[derive(Debug, PartialEq)]
struct Snapshot {
    iteration: usize,
    targets: Array1<f32>,
    n_cached: usize,
    q: Array2<f32>,
    actions: Array2<f32>,
}

fn snapshot(fqi: &Fqi) -> Result<Snapshot> {
    let states = array![[0.0f32], [1.0], [2.0]];
    let absorbing = array![0.0f32, 0.0, 0.0];
    Ok(Snapshot {
        iteration: fqi.iteration(),
        targets: fqi.targets().unwrap().to_owned(),
        n_cached: fqi.cached().unwrap().len(),
        q: fqi.q_values(states.view(), absorbing.view(), false)?,
        actions: fqi.draw_action(states.view(), absorbing.view(), false)?,
    })
}

#[test]
fn test_failed_regressor_fit_keeps_state() -> Result<()> {
    init_logger();
    let opts = FitOptions::default();
    let regressor = FailingRegressor::new();
    let switch = regressor.switch();
    let mut fqi = Fqi::build(config(), QRegressor::simple(regressor))?;
    fqi.fit(batch(), &opts)?;
    fqi.partial_fit(BatchInput::UseCached, &opts)?;
    let before = snapshot(&fqi)?;

    switch.set(true);
    assert!(fqi.fit(batch(), &opts).is_err());
    assert_eq!(snapshot(&fqi)?, before);
    assert!(fqi.partial_fit(BatchInput::UseCached, &opts).is_err());
    assert_eq!(snapshot(&fqi)?, before);
    assert!(fqi.partial_fit(BatchInput::NewBatch(batch()), &opts).is_err());
    assert_eq!(snapshot(&fqi)?, before);
    assert!(fqi
        .partial_fit(BatchInput::NewReward(array![0.0f32, 0.0, 0.0]), &opts)
        .is_err());
    assert_eq!(snapshot(&fqi)?, before);

    switch.set(false);
    fqi.partial_fit(BatchInput::UseCached, &opts)?;
    assert_eq!(fqi.iteration(), 3);
    Ok(())
}

#[test]
fn test_failed_first_fit_stays_untrained() -> Result<()> {
    let regressor = FailingRegressor::new();
    regressor.switch().set(true);
    let mut fqi = Fqi::build(config(), QRegressor::simple(regressor))?;

    assert!(fqi.fit(batch(), &FitOptions::default()).is_err());
    assert_eq!(fqi.iteration(), 0);
    assert!(fqi.cached().is_none());
    let err = fqi
        .draw_action(array![[0.0f32]].view(), array![0.0f32].view(), false)
        .err()
        .unwrap();
    assert!(matches!(kind(&err), Some(FqiError::NotFittedError(_))));
    Ok(())
}

/// Appends a column holding the number of training batches seen so far.
#[derive(Clone)]
struct BatchCounter(usize);

impl FeatureTransform for BatchCounter {
    fn apply(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.0 += 1;
        self.apply_test(x)
    }

    fn apply_test(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut out = Array2::from_elem((x.nrows(), x.ncols() + 1), self.0 as f32);
        out.slice_mut(s![.., ..x.ncols()]).assign(&x);
        Ok(out)
    }

    fn box_clone(&self) -> Box<dyn FeatureTransform> {
        Box::new(self.clone())
    }
}

#[test]
fn test_failed_new_batch_keeps_feature_state() -> Result<()> {
    let opts = FitOptions::default();
    let regressor = FailingRegressor::new();
    let switch = regressor.switch();
    let mut fqi = Fqi::build(config(), QRegressor::simple(regressor))?.with_features(BatchCounter(0));
    fqi.fit(batch(), &opts)?;
    fqi.partial_fit(BatchInput::UseCached, &opts)?;
    let before = snapshot(&fqi)?;
    assert_eq!(before.q[[0, 0]], 1.0);

    switch.set(true);
    assert!(fqi.partial_fit(BatchInput::NewBatch(batch()), &opts).is_err());
    assert_eq!(snapshot(&fqi)?, before);

    // A successful new batch keeps the transform that produced its inputs
    switch.set(false);
    fqi.partial_fit(BatchInput::NewBatch(batch()), &opts)?;
    assert_eq!(fqi.cached().unwrap().sa().column(2), array![2.0f32, 2.0, 2.0]);
    Ok(())
}

#[test]
fn test_scaled_targets() -> Result<()> {
    let mut fqi = Fqi::build(config().scaled(true), QRegressor::simple(LookupRegressor::new()))?;
    let record = fqi.fit(batch(), &FitOptions::default())?;

    assert!(record.get_scalar("target_mean")?.abs() < EPS);
    let cached = fqi.cached().unwrap();
    for j in 0..cached.sa().ncols() {
        assert!(cached.sa().column(j).mean().unwrap().abs() < EPS);
    }
    // Unscaled next states
    assert_eq!(cached.snext().column(0), array![1.0f32, 2.0, 0.0]);

    fqi.partial_fit(BatchInput::UseCached, &FitOptions::default())?;
    assert_eq!(fqi.iteration(), 2);
    Ok(())
}

#[test]
fn test_batch_actions_gives_same_values() -> Result<()> {
    let opts = FitOptions::default();
    let mut fqi1 = lookup_fqi()?;
    let mut fqi2 = Fqi::build(
        config().batch_actions(true),
        QRegressor::simple(LookupRegressor::new()),
    )?;
    for fqi in [&mut fqi1, &mut fqi2].iter_mut() {
        fqi.fit(batch(), &opts)?;
        fqi.partial_fit(BatchInput::UseCached, &opts)?;
    }

    let states = array![[0.0f32], [1.0], [2.0], [3.0]];
    let absorbing = array![0.0f32, 0.0, 1.0, 0.0];
    assert_eq!(
        fqi1.q_values(states.view(), absorbing.view(), false)?,
        fqi2.q_values(states.view(), absorbing.view(), false)?
    );
    assert_eq!(fqi1.targets(), fqi2.targets());
    Ok(())
}

#[test]
fn test_trainer_records() -> Result<()> {
    init_logger();
    let mut fqi = lookup_fqi()?;
    let mut recorder = BufferedRecorder::new();
    let trainer = Trainer::build(TrainerConfig::default().max_iterations(5).tolerance(0.0))?;
    let n = trainer.train(&mut fqi, batch(), &FitOptions::default(), &mut recorder)?;

    // Targets stop changing once the values of the next states are fixed
    assert!(n <= 5);
    assert_eq!(recorder.len(), n);
    let iterations: Vec<f32> = recorder
        .iter()
        .map(|r| r.get_scalar("iteration"))
        .collect::<Result<_, _>>()?;
    assert_eq!(iterations, (1..=n).map(|i| i as f32).collect::<Vec<_>>());
    Ok(())
}
