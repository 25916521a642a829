mod batch_runs;
